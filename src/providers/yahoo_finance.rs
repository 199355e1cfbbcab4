use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use chrono::DateTime;
use serde::Deserialize;
use std::collections::HashMap;
use tokio::sync::OnceCell;
use tracing::{debug, instrument, warn};

use crate::core::config::DEFAULT_YAHOO_BASE_URL;
use crate::core::dividend::{DividendPayment, DividendProvider, DividendQuote};
use crate::providers::{REQUEST_TIMEOUT, client_builder};

/// Hands out the session cookie that Yahoo's crumb endpoint requires.
pub const YAHOO_COOKIE_URL: &str = "https://fc.yahoo.com";

// YahooDividendProvider implementation for DividendProvider
pub struct YahooDividendProvider {
    base_url: String,
    cookie_url: Option<String>,
    client: reqwest::Client,
    /// Fetched once per process; `None` disables quote summaries.
    crumb: OnceCell<Option<String>>,
}

impl YahooDividendProvider {
    /// Session cookies are only primed against Yahoo itself, not against
    /// a custom base URL.
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/');
        let cookie_url = (base_url == DEFAULT_YAHOO_BASE_URL).then_some(YAHOO_COOKIE_URL);
        Self::with_cookie_url(base_url, cookie_url)
    }

    pub fn with_cookie_url(base_url: &str, cookie_url: Option<&str>) -> Result<Self> {
        let client = client_builder(REQUEST_TIMEOUT)
            .cookie_store(true)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(YahooDividendProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            cookie_url: cookie_url.map(str::to_string),
            client,
            crumb: OnceCell::new(),
        })
    }

    async fn crumb(&self) -> Option<&str> {
        self.crumb
            .get_or_init(|| async {
                match self.request_crumb().await {
                    Ok(crumb) => {
                        debug!("Obtained Yahoo crumb");
                        Some(crumb)
                    }
                    Err(e) => {
                        warn!(error = %e, "Yahoo crumb unavailable, skipping quote summaries");
                        None
                    }
                }
            })
            .await
            .as_deref()
    }

    async fn request_crumb(&self) -> Result<String> {
        if let Some(cookie_url) = &self.cookie_url {
            // Only the Set-Cookie header matters here, not the status.
            self.client
                .get(cookie_url)
                .send()
                .await
                .map_err(|e| anyhow!("Request error: {} URL: {}", e, cookie_url))?;
        }

        let url = format!("{}/v1/test/getcrumb", self.base_url);
        debug!("Requesting crumb from {}", url);
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            bail!("HTTP error: {} for crumb", response.status());
        }

        let crumb = response.text().await?.trim().to_string();
        if crumb.is_empty() || crumb.contains(char::is_whitespace) {
            bail!("Unexpected crumb response");
        }
        Ok(crumb)
    }

    async fn fetch_chart(&self, symbol: &str) -> Result<ChartItem> {
        let url = format!(
            "{}/v8/finance/chart/{}?range=5y&interval=1mo&events=div",
            self.base_url, symbol
        );
        debug!("Requesting dividend history from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for symbol: {} URL: {}", e, symbol, url))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for symbol: {}",
                response.status(),
                symbol
            ));
        }

        let text = response.text().await?;
        let data: YahooChartResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse chart response for {}: {}", symbol, e))?;

        if let Some(error) = data.chart.error {
            return Err(anyhow!(
                "Yahoo error for symbol {}: {}",
                symbol,
                error.description.unwrap_or_else(|| "unknown".to_string())
            ));
        }

        data.chart
            .result
            .and_then(|items| items.into_iter().next())
            .ok_or_else(|| anyhow!("No chart data found for symbol: {}", symbol))
    }

    async fn fetch_summary(&self, symbol: &str) -> Result<Option<SummaryDetail>> {
        let Some(crumb) = self.crumb().await else {
            return Ok(None);
        };
        let url = reqwest::Url::parse_with_params(
            &format!("{}/v10/finance/quoteSummary/{}", self.base_url, symbol),
            &[("modules", "summaryDetail"), ("crumb", crumb)],
        )?;
        debug!("Requesting quote summary for {}", symbol);

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for quote summary of: {}",
                response.status(),
                symbol
            ));
        }

        let data = response.json::<QuoteSummaryResponse>().await?;
        Ok(data
            .quote_summary
            .result
            .and_then(|items| items.into_iter().next())
            .and_then(|item| item.summary_detail))
    }
}

#[derive(Deserialize, Debug)]
struct YahooChartResponse {
    chart: ChartResult,
}

#[derive(Deserialize, Debug)]
struct ChartResult {
    result: Option<Vec<ChartItem>>,
    error: Option<ChartError>,
}

#[derive(Deserialize, Debug)]
struct ChartError {
    description: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ChartItem {
    meta: ChartMeta,
    events: Option<ChartEvents>,
}

#[derive(Deserialize, Debug)]
struct ChartMeta {
    #[serde(alias = "regularMarketPrice")]
    regular_market_price: Option<f64>,
    currency: Option<String>,
    #[serde(alias = "longName")]
    long_name: Option<String>,
    #[serde(alias = "shortName")]
    short_name: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ChartEvents {
    dividends: Option<HashMap<String, DividendEvent>>,
}

#[derive(Deserialize, Debug)]
struct DividendEvent {
    amount: f64,
    date: i64,
}

#[derive(Deserialize, Debug)]
struct QuoteSummaryResponse {
    #[serde(alias = "quoteSummary")]
    quote_summary: QuoteSummaryResult,
}

#[derive(Deserialize, Debug)]
struct QuoteSummaryResult {
    result: Option<Vec<QuoteSummaryItem>>,
}

#[derive(Deserialize, Debug)]
struct QuoteSummaryItem {
    #[serde(alias = "summaryDetail")]
    summary_detail: Option<SummaryDetail>,
}

#[derive(Deserialize, Debug, Default)]
struct SummaryDetail {
    #[serde(alias = "marketCap")]
    market_cap: Option<RawValue>,
    #[serde(alias = "payoutRatio")]
    payout_ratio: Option<RawValue>,
    #[serde(alias = "dividendYield")]
    dividend_yield: Option<RawValue>,
}

// Yahoo wraps numbers as {"raw": 0.0123, "fmt": "1.23%"}, or {} when absent.
#[derive(Deserialize, Debug)]
struct RawValue {
    raw: Option<f64>,
}

fn raw(value: Option<RawValue>) -> Option<f64> {
    value.and_then(|v| v.raw)
}

fn extract_dividends(events: Option<ChartEvents>) -> Vec<DividendPayment> {
    let mut payments: Vec<DividendPayment> = events
        .and_then(|e| e.dividends)
        .unwrap_or_default()
        .into_values()
        .filter_map(|event| {
            DateTime::from_timestamp(event.date, 0).map(|dt| DividendPayment {
                date: dt.date_naive(),
                amount: event.amount,
            })
        })
        .collect();
    payments.sort_by_key(|p| p.date);
    payments
}

#[async_trait]
impl DividendProvider for YahooDividendProvider {
    #[instrument(
        name = "YahooDividendFetch",
        skip(self),
        fields(symbol = %symbol)
    )]
    async fn fetch_quote(&self, symbol: &str) -> Result<DividendQuote> {
        let item = self.fetch_chart(symbol).await?;

        // Size and payout data only refine the reliability score.
        let summary = match self.fetch_summary(symbol).await {
            Ok(summary) => summary.unwrap_or_default(),
            Err(e) => {
                debug!(error = %e, "Quote summary unavailable, continuing without it");
                SummaryDetail::default()
            }
        };

        let dividends = extract_dividends(item.events);
        debug!(count = dividends.len(), "Parsed dividend history");

        Ok(DividendQuote {
            company_name: item.meta.long_name.or(item.meta.short_name),
            currency: item.meta.currency,
            price: item.meta.regular_market_price,
            reported_yield: raw(summary.dividend_yield).map(|y| y * 100.0),
            market_cap: raw(summary.market_cap),
            payout_ratio: raw(summary.payout_ratio),
            dividends,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount_crumb(mock_server: &MockServer, crumb: &str) {
        Mock::given(method("GET"))
            .and(path("/v1/test/getcrumb"))
            .respond_with(ResponseTemplate::new(200).set_body_string(crumb))
            .expect(1)
            .mount(mock_server)
            .await;
    }

    pub async fn create_mock_server(symbol: &str, mock_response: &str) -> MockServer {
        let mock_server = MockServer::start().await;
        let request_path = format!("/v8/finance/chart/{symbol}");

        Mock::given(method("GET"))
            .and(path(request_path))
            .and(query_param("events", "div"))
            .respond_with(ResponseTemplate::new(200).set_body_string(mock_response))
            .mount(&mock_server)
            .await;

        mock_server
    }

    fn ts(y: i32, m: u32, d: u32) -> i64 {
        Utc.with_ymd_and_hms(y, m, d, 13, 30, 0).unwrap().timestamp()
    }

    fn chart_with_dividends() -> String {
        let (t1, t2, t3) = (ts(2024, 6, 14), ts(2024, 9, 13), ts(2024, 3, 14));
        format!(
            r#"{{
                "chart": {{
                    "result": [{{
                        "meta": {{
                            "regularMarketPrice": 62.5,
                            "currency": "USD",
                            "longName": "The Coca-Cola Company",
                            "shortName": "Coca-Cola"
                        }},
                        "events": {{
                            "dividends": {{
                                "{t1}": {{"amount": 0.485, "date": {t1}}},
                                "{t2}": {{"amount": 0.485, "date": {t2}}},
                                "{t3}": {{"amount": 0.485, "date": {t3}}}
                            }}
                        }}
                    }}],
                    "error": null
                }}
            }}"#
        )
    }

    #[tokio::test]
    async fn test_successful_quote_fetch() {
        let mock_server = create_mock_server("KO", &chart_with_dividends()).await;
        mount_crumb(&mock_server, "Xy1/z.AbC").await;

        Mock::given(method("GET"))
            .and(path("/v10/finance/quoteSummary/KO"))
            .and(query_param("modules", "summaryDetail"))
            .and(query_param("crumb", "Xy1/z.AbC"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{
                    "quoteSummary": {
                        "result": [{
                            "summaryDetail": {
                                "marketCap": {"raw": 270000000000.0, "fmt": "270B"},
                                "payoutRatio": {"raw": 0.74, "fmt": "74%"},
                                "dividendYield": {"raw": 0.031, "fmt": "3.10%"}
                            }
                        }],
                        "error": null
                    }
                }"#,
            ))
            .mount(&mock_server)
            .await;

        let provider = YahooDividendProvider::new(&mock_server.uri()).unwrap();
        let quote = provider.fetch_quote("KO").await.unwrap();

        assert_eq!(quote.company_name.as_deref(), Some("The Coca-Cola Company"));
        assert_eq!(quote.currency.as_deref(), Some("USD"));
        assert_eq!(quote.price, Some(62.5));
        assert_eq!(quote.market_cap, Some(270_000_000_000.0));
        assert_eq!(quote.payout_ratio, Some(0.74));
        assert!((quote.reported_yield.unwrap() - 3.1).abs() < 1e-9);

        let dates: Vec<NaiveDate> = quote.dividends.iter().map(|p| p.date).collect();
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2024, 3, 14).unwrap(),
                NaiveDate::from_ymd_opt(2024, 6, 14).unwrap(),
                NaiveDate::from_ymd_opt(2024, 9, 13).unwrap(),
            ]
        );
        assert!(quote.dividends.iter().all(|p| p.amount == 0.485));
    }

    #[tokio::test]
    async fn test_missing_summary_is_not_fatal() {
        // Crumb works but no quoteSummary mock: the server answers 404
        let mock_server = create_mock_server("KO", &chart_with_dividends()).await;
        mount_crumb(&mock_server, "abc").await;
        let provider = YahooDividendProvider::new(&mock_server.uri()).unwrap();

        let quote = provider.fetch_quote("KO").await.unwrap();
        assert_eq!(quote.dividends.len(), 3);
        assert!(quote.market_cap.is_none());
        assert!(quote.payout_ratio.is_none());
        assert!(quote.reported_yield.is_none());
    }

    #[tokio::test]
    async fn test_summaries_skipped_without_crumb() {
        let mock_server = create_mock_server("KO", &chart_with_dividends()).await;
        Mock::given(method("GET"))
            .and(path("/v1/test/getcrumb"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&mock_server)
            .await;
        let provider = YahooDividendProvider::new(&mock_server.uri()).unwrap();

        for _ in 0..3 {
            let quote = provider.fetch_quote("KO").await.unwrap();
            assert!(quote.market_cap.is_none());
        }

        let requests = mock_server.received_requests().await.unwrap();
        assert!(
            requests
                .iter()
                .all(|r| !r.url.path().starts_with("/v10/finance/quoteSummary"))
        );
        assert_eq!(requests.len(), 4);
    }

    #[tokio::test]
    async fn test_cookie_primed_once_before_crumb() {
        let mock_server = create_mock_server("KO", &chart_with_dividends()).await;
        Mock::given(method("GET"))
            .and(path("/consent"))
            .respond_with(
                ResponseTemplate::new(404).insert_header("set-cookie", "A3=d=AQABBK; Path=/"),
            )
            .expect(1)
            .mount(&mock_server)
            .await;
        mount_crumb(&mock_server, "abc").await;

        let cookie_url = format!("{}/consent", mock_server.uri());
        let provider =
            YahooDividendProvider::with_cookie_url(&mock_server.uri(), Some(&cookie_url)).unwrap();
        provider.fetch_quote("KO").await.unwrap();
        provider.fetch_quote("KO").await.unwrap();
    }

    #[tokio::test]
    async fn test_symbol_without_dividends() {
        let mock_response = r#"{
            "chart": {
                "result": [{
                    "meta": {
                        "regularMarketPrice": 185.2,
                        "currency": "USD",
                        "shortName": "Amazon.com, Inc."
                    }
                }]
            }
        }"#;
        let mock_server = create_mock_server("AMZN", mock_response).await;
        let provider = YahooDividendProvider::new(&mock_server.uri()).unwrap();

        let quote = provider.fetch_quote("AMZN").await.unwrap();
        assert!(quote.dividends.is_empty());
        assert_eq!(quote.company_name.as_deref(), Some("Amazon.com, Inc."));
    }

    #[tokio::test]
    async fn test_unknown_symbol_error_response() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/DELISTED"))
            .respond_with(ResponseTemplate::new(404).set_body_string(
                r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#,
            ))
            .mount(&mock_server)
            .await;

        let provider = YahooDividendProvider::new(&mock_server.uri()).unwrap();
        let result = provider.fetch_quote("DELISTED").await;
        assert_eq!(
            result.unwrap_err().to_string(),
            "HTTP error: 404 Not Found for symbol: DELISTED"
        );
    }

    #[tokio::test]
    async fn test_chart_error_payload() {
        let mock_response = r#"{"chart":{"result":null,"error":{"code":"Bad Request","description":"Invalid range"}}}"#;
        let mock_server = create_mock_server("KO", mock_response).await;
        let provider = YahooDividendProvider::new(&mock_server.uri()).unwrap();

        let result = provider.fetch_quote("KO").await;
        assert_eq!(
            result.unwrap_err().to_string(),
            "Yahoo error for symbol KO: Invalid range"
        );
    }

    #[tokio::test]
    async fn test_malformed_chart_response() {
        let mock_response = r#"{"charts": []}"#;
        let mock_server = create_mock_server("KO", mock_response).await;
        let provider = YahooDividendProvider::new(&mock_server.uri()).unwrap();

        let result = provider.fetch_quote("KO").await;
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to parse chart response for KO")
        );
    }
}
