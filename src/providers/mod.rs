pub mod frankfurter;
pub mod yahoo_finance;

use anyhow::{Context, Result};
use std::time::Duration;

pub const USER_AGENT: &str = "divcal/0.1";

/// Upper bound for a single upstream request. A timeout counts as a failed
/// fetch, which the caches answer with their previous snapshot.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub(crate) fn client_builder(timeout: Duration) -> reqwest::ClientBuilder {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
}

pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    client_builder(timeout)
        .build()
        .context("Failed to build HTTP client")
}
