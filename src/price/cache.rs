//! Time-bounded cache in front of the price oracle.
//!
//! Fetch failures never escape: every call yields a `PriceSample`, with the
//! failure recorded in its `error` field and in the error log.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

use super::sample::{now_ms, PriceSample, STALE_WINDOW};
use crate::api::PriceSource;
use crate::error::FetchError;

/// Failures kept in the error log; older ones are dropped first.
pub const ERROR_LOG_CAP: usize = 50;

/// One failed fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorLogEntry {
    pub error: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone)]
struct Cached {
    sample: PriceSample,
    fetched_at: Instant,
}

pub struct PriceCache {
    source: Arc<dyn PriceSource>,
    cache_duration: Duration,
    stale_window: Duration,
    cached: Option<Cached>,
    /// Last successful sample, served again (with the new error) when a fetch fails
    last_good: Option<PriceSample>,
    error_log: VecDeque<ErrorLogEntry>,
}

impl PriceCache {
    pub fn new(source: Arc<dyn PriceSource>, cache_duration: Duration) -> Self {
        Self {
            source,
            cache_duration,
            stale_window: STALE_WINDOW,
            cached: None,
            last_good: None,
            error_log: VecDeque::new(),
        }
    }

    pub fn with_stale_window(mut self, stale_window: Duration) -> Self {
        self.stale_window = stale_window;
        self
    }

    /// Cached sample if younger than the cache duration, otherwise a new fetch.
    pub async fn get_price(&mut self) -> PriceSample {
        if let Some(cached) = &self.cached {
            if cached.fetched_at.elapsed() < self.cache_duration {
                debug!(price = cached.sample.price, "Serving cached price");
                return cached.sample.clone();
            }
        }
        self.refresh_price().await
    }

    /// Bypass the cache and fetch exactly once.
    pub async fn refresh_price(&mut self) -> PriceSample {
        let sample = match self.source.fetch_price().await {
            Ok(price) if price > 0.0 => {
                let sample = PriceSample::ok(price, now_ms());
                self.last_good = Some(sample.clone());
                sample
            }
            Ok(price) => self.degrade(FetchError::Parse(format!("non-positive price {price}"))),
            Err(e) => self.degrade(e),
        };

        self.cached = Some(Cached {
            sample: sample.clone(),
            fetched_at: Instant::now(),
        });
        sample
    }

    /// Whether `sample` is usable right now under this cache's stale window.
    pub fn is_valid(&self, sample: &PriceSample) -> bool {
        sample.is_valid(now_ms(), self.stale_window)
    }

    /// Most recent failures, oldest first.
    pub fn error_log(&self) -> &VecDeque<ErrorLogEntry> {
        &self.error_log
    }

    /// Forget everything, including the last good sample.
    pub fn clear(&mut self) {
        self.cached = None;
        self.last_good = None;
        self.error_log.clear();
    }

    fn degrade(&mut self, e: FetchError) -> PriceSample {
        let error = e.to_string();
        let now = now_ms();
        warn!(error = %error, "Price fetch failed");

        self.error_log.push_back(ErrorLogEntry {
            error: error.clone(),
            timestamp: now,
        });
        if self.error_log.len() > ERROR_LOG_CAP {
            self.error_log.pop_front();
        }

        match &self.last_good {
            Some(good) => PriceSample {
                price: good.price,
                timestamp: good.timestamp,
                error,
            },
            None => PriceSample::failed(error, now),
        }
    }
}
