//! Frankfurter (ECB reference rates) as a source of exchange rate tables.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::core::currency::{RateSource, RateTable};
use crate::providers::{REQUEST_TIMEOUT, http_client};

pub struct FrankfurterRateSource {
    base_url: String,
    client: reqwest::Client,
}

impl FrankfurterRateSource {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, REQUEST_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(FrankfurterRateSource {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: http_client(timeout)?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct LatestRatesResponse {
    base: String,
    date: Option<String>,
    rates: HashMap<String, f64>,
}

#[async_trait]
impl RateSource for FrankfurterRateSource {
    #[instrument(name = "FrankfurterRatesFetch", skip(self), fields(base = %base))]
    async fn fetch_rates(&self, base: &str) -> Result<RateTable> {
        let base = base.to_uppercase();
        let url = format!("{}/latest?base={}", self.base_url, base);
        debug!("Requesting exchange rates from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for base currency: {}", e, base))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for base currency: {}",
                response.status(),
                base
            ));
        }

        let text = response.text().await?;
        let data: LatestRatesResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse JSON response for {}: {}", base, e))?;

        if !data.base.eq_ignore_ascii_case(&base) {
            return Err(anyhow!(
                "Rate source answered with base {} instead of {}",
                data.base,
                base
            ));
        }

        let as_of = data
            .date
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok());
        Ok(RateTable::new(&base, as_of, data.rates))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cache::ManualClock;
    use crate::core::currency::{RATE_TABLE_TTL, RateService};
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const USD_RATES: &str =
        r#"{"amount":1.0,"base":"USD","date":"2025-02-28","rates":{"EUR":0.9614}}"#;

    async fn create_mock_server(status: u16, body: &str) -> MockServer {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/latest"))
            .and(query_param("base", "USD"))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&mock_server)
            .await;
        mock_server
    }

    #[tokio::test]
    async fn test_successful_rates_fetch() {
        let mock_server = create_mock_server(
            200,
            r#"{"amount":1.0,"base":"USD","date":"2025-02-28","rates":{"EUR":0.9614,"GBP":0.7945,"JPY":150.6}}"#,
        )
        .await;
        let source = FrankfurterRateSource::new(&mock_server.uri()).unwrap();

        let table = source.fetch_rates("usd").await.unwrap();
        assert_eq!(table.base(), "USD");
        assert_eq!(table.len(), 3);
        assert_eq!(table.as_of(), NaiveDate::from_ymd_opt(2025, 2, 28));
        assert_eq!(table.rate("USD", "EUR"), Some(0.9614));
        assert_eq!(table.rate("USD", "JPY"), Some(150.6));
    }

    #[tokio::test]
    async fn test_rates_api_error_response() {
        let mock_server = create_mock_server(500, "").await;
        let source = FrankfurterRateSource::new(&mock_server.uri()).unwrap();

        let result = source.fetch_rates("USD").await;
        assert_eq!(
            result.unwrap_err().to_string(),
            "HTTP error: 500 Internal Server Error for base currency: USD"
        );
    }

    #[tokio::test]
    async fn test_rates_api_malformed_response() {
        let mock_server = create_mock_server(200, r#"{"base":"USD","rate":{}}"#).await;
        let source = FrankfurterRateSource::new(&mock_server.uri()).unwrap();

        let result = source.fetch_rates("USD").await;
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to parse JSON response for USD")
        );
    }

    #[tokio::test]
    async fn test_rates_api_wrong_base() {
        let mock_server =
            create_mock_server(200, r#"{"base":"EUR","date":null,"rates":{"USD":1.04}}"#).await;
        let source = FrankfurterRateSource::new(&mock_server.uri()).unwrap();

        let result = source.fetch_rates("USD").await;
        assert!(result.unwrap_err().to_string().contains("instead of USD"));
    }

    #[tokio::test]
    async fn test_slow_response_times_out() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/latest"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(USD_RATES)
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&mock_server)
            .await;
        let source =
            FrankfurterRateSource::with_timeout(&mock_server.uri(), Duration::from_millis(50))
                .unwrap();

        let err = source.fetch_rates("USD").await.unwrap_err();
        assert!(err.to_string().starts_with("Request error"));
    }

    #[tokio::test]
    async fn test_timed_out_refresh_serves_previous_table() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/latest"))
            .respond_with(ResponseTemplate::new(200).set_body_string(USD_RATES))
            .up_to_n_times(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/latest"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(USD_RATES)
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&mock_server)
            .await;

        let source =
            FrankfurterRateSource::with_timeout(&mock_server.uri(), Duration::from_millis(50))
                .unwrap();
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
        ));
        let rates = RateService::new(Arc::new(source), "USD", clock.clone());

        let fresh = rates.rate_table().await.unwrap();
        assert!(!fresh.is_stale());

        clock.advance(RATE_TABLE_TTL);
        let stale = rates.rate_table().await.unwrap();
        assert!(stale.is_stale());
        assert_eq!(stale.fetched_at, fresh.fetched_at);
        assert!(Arc::ptr_eq(&fresh.value, &stale.value));
    }
}
