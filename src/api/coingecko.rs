use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use super::PriceSource;
use crate::error::FetchError;

/// CoinGecko simple price response: `{"bitcoin": {"usd": 65000.0}}`
#[derive(Debug, Deserialize)]
struct CoinGeckoQuote {
    bitcoin: CoinGeckoUsd,
}

#[derive(Debug, Deserialize)]
struct CoinGeckoUsd {
    usd: f64,
}

/// CryptoCompare price response: `{"USD": 65000.0}`
#[derive(Debug, Deserialize)]
struct CryptoCompareQuote {
    #[serde(rename = "USD")]
    usd: f64,
}

/// Quotes BTC/USD over HTTP, CoinGecko first, CryptoCompare when that fails.
#[derive(Debug, Clone)]
pub struct HttpPriceSource {
    client: reqwest::Client,
    primary_url: String,
    fallback_url: Option<String>,
}

impl HttpPriceSource {
    pub fn new(primary_url: impl Into<String>, fallback_url: Option<String>) -> Self {
        Self::with_client(reqwest::Client::new(), primary_url, fallback_url)
    }

    pub fn with_client(
        client: reqwest::Client,
        primary_url: impl Into<String>,
        fallback_url: Option<String>,
    ) -> Self {
        Self {
            client,
            primary_url: primary_url.into(),
            fallback_url,
        }
    }

    async fn get_body(&self, url: &str) -> Result<String, FetchError> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http {
                status: status.as_u16(),
            });
        }

        Ok(response.text().await?)
    }

    async fn fetch_primary(&self) -> Result<f64, FetchError> {
        let body = self.get_body(&self.primary_url).await?;
        let price = parse_coingecko(&body)?;
        debug!(price, "Fetched price from CoinGecko");
        Ok(price)
    }

    async fn fetch_fallback(&self, url: &str) -> Result<f64, FetchError> {
        let body = self.get_body(url).await?;
        let price = parse_cryptocompare(&body)?;
        debug!(price, "Fetched price from CryptoCompare");
        Ok(price)
    }
}

#[async_trait]
impl PriceSource for HttpPriceSource {
    async fn fetch_price(&self) -> Result<f64, FetchError> {
        match self.fetch_primary().await {
            Ok(price) => Ok(price),
            Err(e) => {
                let Some(url) = self.fallback_url.as_deref() else {
                    return Err(e);
                };
                warn!(error = %e, "Primary price source failed, trying fallback");
                self.fetch_fallback(url).await
            }
        }
    }
}

fn parse_coingecko(body: &str) -> Result<f64, FetchError> {
    let quote: CoinGeckoQuote =
        serde_json::from_str(body).map_err(|e| FetchError::Parse(e.to_string()))?;
    Ok(quote.bitcoin.usd)
}

fn parse_cryptocompare(body: &str) -> Result<f64, FetchError> {
    let quote: CryptoCompareQuote =
        serde_json::from_str(body).map_err(|e| FetchError::Parse(e.to_string()))?;
    Ok(quote.usd)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Answer every request on a local port with `status` and `body`.
    async fn serve(status: u16, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                let response = format!(
                    "HTTP/1.1 {status} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        format!("http://{addr}/price")
    }

    fn source(primary: String, fallback: Option<String>) -> HttpPriceSource {
        let client = reqwest::Client::builder().no_proxy().build().unwrap();
        HttpPriceSource::with_client(client, primary, fallback)
    }

    #[tokio::test]
    async fn test_non_success_status_is_http_error() {
        let primary = serve(500, "").await;

        let result = source(primary, None).fetch_price().await;
        assert_eq!(result, Err(FetchError::Http { status: 500 }));
        assert_eq!(
            result.unwrap_err().to_string(),
            "HTTP error! status: 500"
        );
    }

    #[tokio::test]
    async fn test_primary_failure_uses_fallback() {
        let primary = serve(500, "").await;
        let fallback = serve(200, r#"{"USD":64999.5}"#).await;

        let price = source(primary, Some(fallback)).fetch_price().await;
        assert_eq!(price, Ok(64999.5));
    }

    #[tokio::test]
    async fn test_both_sources_failing_reports_fallback_error() {
        let primary = serve(500, "").await;
        let fallback = serve(503, "").await;

        let result = source(primary, Some(fallback)).fetch_price().await;
        assert_eq!(result, Err(FetchError::Http { status: 503 }));
    }

    #[tokio::test]
    async fn test_non_json_body_is_parse_error() {
        let primary = serve(200, "Server Down").await;

        let result = source(primary, None).fetch_price().await;
        assert!(matches!(result, Err(FetchError::Parse(_))), "{result:?}");
    }

    #[tokio::test]
    async fn test_primary_success_skips_fallback() {
        let primary = serve(200, r#"{"bitcoin":{"usd":65000.25}}"#).await;
        // nothing listens here
        let fallback = Some("http://127.0.0.1:9/price".to_string());

        let price = source(primary, fallback).fetch_price().await;
        assert_eq!(price, Ok(65000.25));
    }

    #[test]
    fn test_parse_coingecko() {
        assert_eq!(parse_coingecko(r#"{"bitcoin":{"usd":65000}}"#), Ok(65000.0));
        assert_eq!(
            parse_coingecko(r#"{"bitcoin":{"usd":55000.42}}"#),
            Ok(55000.42)
        );
    }

    #[test]
    fn test_parse_coingecko_malformed() {
        assert!(matches!(
            parse_coingecko(r#"{"ethereum":{"usd":3000}}"#),
            Err(FetchError::Parse(_))
        ));
        assert!(matches!(
            parse_coingecko("Server Down"),
            Err(FetchError::Parse(_))
        ));
    }

    #[test]
    fn test_parse_cryptocompare() {
        assert_eq!(parse_cryptocompare(r#"{"USD":64999.5}"#), Ok(64999.5));
        assert!(parse_cryptocompare(r#"{"usd":1}"#).is_err());
    }
}
