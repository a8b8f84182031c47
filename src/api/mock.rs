//! Scripted price source for tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::PriceSource;
use crate::error::FetchError;

/// Replays queued responses in order; the last one repeats once the queue
/// runs dry. Clones share the script and the fetch counter.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    script: Arc<Mutex<VecDeque<Result<f64, FetchError>>>>,
    last: Arc<Mutex<Option<Result<f64, FetchError>>>>,
    calls: Arc<AtomicUsize>,
    /// Held before answering, to keep a fetch in flight
    delay: Duration,
}

impl ScriptedSource {
    pub fn new(responses: impl IntoIterator<Item = Result<f64, FetchError>>) -> Self {
        Self {
            script: Arc::new(Mutex::new(responses.into_iter().collect())),
            ..Default::default()
        }
    }

    /// Always answers with `price`.
    pub fn fixed(price: f64) -> Self {
        Self::new([Ok(price)])
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PriceSource for ScriptedSource {
    async fn fetch_price(&self) -> Result<f64, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let response = {
            let mut last = self.last.lock().unwrap();
            if let Some(next) = self.script.lock().unwrap().pop_front() {
                *last = Some(next);
            }
            last.clone().unwrap_or(Err(FetchError::Unknown))
        };
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        response
    }
}
