mod cache;
mod sample;

pub use cache::{ErrorLogEntry, PriceCache, ERROR_LOG_CAP};
pub use sample::{is_price_valid, now_ms, PriceSample, STALE_WINDOW};
