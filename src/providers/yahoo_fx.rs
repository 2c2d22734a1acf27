use super::util::with_retry;
use crate::core::source::{RateProvider, SourceKind};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

// YahooFxProvider implementation for the market-quote rate source.
// Caching happens in the resolver layer; this adapter only owns the
// HTTP call and its timeout.
pub struct YahooFxProvider {
    base_url: String,
    client: reqwest::Client,
}

impl YahooFxProvider {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("fxr/1.0")
            .timeout(timeout)
            .build()?;
        Ok(YahooFxProvider {
            base_url: base_url.to_string(),
            client,
        })
    }
}

#[derive(Debug, Deserialize)]
struct YahooCurrencyResponse {
    chart: CurrencyChartResult,
}

#[derive(Debug, Deserialize)]
struct CurrencyChartResult {
    result: Vec<CurrencyChartItem>,
}

#[derive(Debug, Deserialize)]
struct CurrencyChartItem {
    meta: CurrencyChartMeta,
}

#[derive(Debug, Deserialize)]
struct CurrencyChartMeta {
    #[serde(alias = "regularMarketPrice")]
    regular_market_price: f64,
}

#[async_trait]
impl RateProvider for YahooFxProvider {
    fn kind(&self) -> SourceKind {
        SourceKind::Api
    }

    #[instrument(
        name = "YahooFxFetch",
        skip(self),
        fields(base = %base, target = %target)
    )]
    async fn fetch_rate(&self, base: &str, target: &str) -> Result<f64> {
        let symbol = format!("{base}{target}=X");
        let url = format!("{}/v8/finance/chart/{symbol}", self.base_url);
        debug!("Requesting currency rate from {}", url);

        let response = with_retry(|| async { self.client.get(&url).send().await }, 2, 250)
            .await
            .map_err(|e| anyhow!("Request error: {} for currency pair: {}", e, symbol))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for currency pair: {}",
                response.status(),
                symbol
            ));
        }

        let text = response.text().await?;

        let data: YahooCurrencyResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse JSON response for {}: {}", symbol, e))?;

        let item = data
            .chart
            .result
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("No rate data found for currency pair: {}", symbol))?;

        let rate = item.meta.regular_market_price;
        if !(rate.is_finite() && rate > 0.0) {
            return Err(anyhow!(
                "Non-positive rate {} for currency pair: {}",
                rate,
                symbol
            ));
        }
        Ok(rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn create_mock_server(symbol: &str, mock_response: &str) -> MockServer {
        let mock_server = MockServer::start().await;
        let request_path = format!("/v8/finance/chart/{symbol}");

        Mock::given(method("GET"))
            .and(path(request_path))
            .respond_with(ResponseTemplate::new(200).set_body_string(mock_response))
            .mount(&mock_server)
            .await;

        mock_server
    }

    fn provider(base_url: &str) -> YahooFxProvider {
        YahooFxProvider::new(base_url, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_successful_rate_fetch() {
        let mock_response = r#"{
            "chart": {
                "result": [{
                    "meta": {
                        "regularMarketPrice": 0.9123
                    }
                }]
            }
        }"#;

        let mock_server = create_mock_server("USDEUR=X", mock_response).await;
        let rate = provider(&mock_server.uri())
            .fetch_rate("USD", "EUR")
            .await
            .unwrap();
        assert_eq!(rate, 0.9123);
    }

    #[tokio::test]
    async fn test_http_error_is_failure() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let result = provider(&mock_server.uri()).fetch_rate("USD", "EUR").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_malformed_response_is_failure() {
        let mock_server = create_mock_server("USDEUR=X", "not json").await;
        let result = provider(&mock_server.uri()).fetch_rate("USD", "EUR").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_zero_rate_rejected() {
        let mock_response = r#"{
            "chart": {
                "result": [{
                    "meta": {
                        "regularMarketPrice": 0.0
                    }
                }]
            }
        }"#;

        let mock_server = create_mock_server("USDEUR=X", mock_response).await;
        let result = provider(&mock_server.uri()).fetch_rate("USD", "EUR").await;
        assert!(result.is_err());
    }
}
