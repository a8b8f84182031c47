use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Samples older than this are never usable.
pub const STALE_WINDOW: Duration = Duration::from_secs(60);

/// Current wall-clock time in unix milliseconds.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// One BTC/USD quotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSample {
    /// Price in USD. 0 when no valid price was ever fetched
    pub price: f64,
    /// Fetch time in unix milliseconds
    pub timestamp: i64,
    /// Empty when the fetch succeeded
    pub error: String,
}

impl PriceSample {
    pub fn ok(price: f64, timestamp: i64) -> Self {
        Self {
            price,
            timestamp,
            error: String::new(),
        }
    }

    /// A failed fetch with nothing to fall back on.
    pub fn failed(error: impl Into<String>, timestamp: i64) -> Self {
        Self {
            price: 0.0,
            timestamp,
            error: error.into(),
        }
    }

    pub fn has_error(&self) -> bool {
        !self.error.is_empty()
    }

    /// Positive, error-free and younger than `stale_window` at `now_ms`.
    pub fn is_valid(&self, now_ms: i64, stale_window: Duration) -> bool {
        let age_ms = now_ms - self.timestamp;
        self.price > 0.0 && !self.has_error() && age_ms < stale_window.as_millis() as i64
    }
}

/// Validity against the default 60s window.
pub fn is_price_valid(sample: &PriceSample, now_ms: i64) -> bool {
    sample.is_valid(now_ms, STALE_WINDOW)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000_000;

    #[test]
    fn test_recent_price_is_valid() {
        assert!(is_price_valid(&PriceSample::ok(50000.0, NOW), NOW));
        assert!(is_price_valid(&PriceSample::ok(50000.0, NOW - 59_999), NOW));
    }

    #[test]
    fn test_zero_price_is_invalid() {
        assert!(!is_price_valid(&PriceSample::ok(0.0, NOW), NOW));
        assert!(!is_price_valid(&PriceSample::ok(-1.0, NOW), NOW));
    }

    #[test]
    fn test_error_is_invalid() {
        let sample = PriceSample {
            price: 50000.0,
            timestamp: NOW,
            error: "An error occurred".to_string(),
        };
        assert!(!is_price_valid(&sample, NOW));
    }

    #[test]
    fn test_stale_is_invalid() {
        // 61 seconds old
        assert!(!is_price_valid(&PriceSample::ok(50000.0, NOW - 61_000), NOW));
        // exactly at the window edge
        assert!(!is_price_valid(&PriceSample::ok(50000.0, NOW - 60_000), NOW));
    }

    #[test]
    fn test_custom_window() {
        let sample = PriceSample::ok(50000.0, NOW - 20_000);
        assert!(sample.is_valid(NOW, Duration::from_secs(30)));
        assert!(!sample.is_valid(NOW, Duration::from_secs(10)));
    }
}
