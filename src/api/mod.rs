pub mod coingecko;
#[cfg(test)]
pub mod mock;

use async_trait::async_trait;

use crate::error::FetchError;

pub use coingecko::HttpPriceSource;

/// Anything that can quote the current BTC/USD price.
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch_price(&self) -> Result<f64, FetchError>;
}
