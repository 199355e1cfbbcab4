//! Currency rates: the provider abstraction and the cached rate table.

use crate::core::cache::{Clock, Freshness, Snapshot, TtlCell};
use crate::core::error::CoreError;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// How long a fetched rate table is served without refetching.
pub const RATE_TABLE_TTL: Duration = Duration::from_secs(30 * 60);

#[async_trait]
pub trait CurrencyRateProvider: Send + Sync {
    async fn get_rate(&self, from: &str, to: &str) -> Result<f64, CoreError>;
}

/// Upstream source of a full rate table quoted against one base currency.
#[async_trait]
pub trait RateSource: Send + Sync {
    async fn fetch_rates(&self, base: &str) -> anyhow::Result<RateTable>;
}

/// Exchange rates keyed by currency pair, e.g. `"USD_EUR"`.
///
/// Every entry is quoted from the same base. Pairs between two quoted
/// currencies are answered through the base, so `A->B` and `B->A` are
/// always reciprocal.
#[derive(Debug, Clone, PartialEq)]
pub struct RateTable {
    base: String,
    as_of: Option<NaiveDate>,
    rates: HashMap<String, f64>,
}

impl RateTable {
    /// Builds a table from `(currency, rate)` quotes against `base`.
    /// Non-finite and non-positive quotes are dropped.
    pub fn new(
        base: &str,
        as_of: Option<NaiveDate>,
        quotes: impl IntoIterator<Item = (String, f64)>,
    ) -> Self {
        let base = base.to_uppercase();
        let rates = quotes
            .into_iter()
            .filter(|(_, rate)| rate.is_finite() && *rate > 0.0)
            .map(|(code, rate)| (Self::pair_key(&base, &code.to_uppercase()), rate))
            .collect();
        Self { base, as_of, rates }
    }

    pub fn pair_key(from: &str, to: &str) -> String {
        format!("{from}_{to}")
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn as_of(&self) -> Option<NaiveDate> {
        self.as_of
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    fn quote(&self, code: &str) -> Option<f64> {
        if code == self.base {
            return Some(1.0);
        }
        self.rates.get(&Self::pair_key(&self.base, code)).copied()
    }

    /// Rate to multiply an amount in `from` by to express it in `to`.
    pub fn rate(&self, from: &str, to: &str) -> Option<f64> {
        let from = from.to_uppercase();
        let to = to.to_uppercase();
        if from == to {
            return Some(1.0);
        }
        if from == self.base {
            return self.quote(&to);
        }
        Some(self.quote(&to)? / self.quote(&from)?)
    }
}

/// Serves rates from a cached table, refetching it after [`RATE_TABLE_TTL`].
///
/// A failed refetch falls back to the previous table. Same-currency
/// lookups never touch the source.
pub struct RateService {
    source: Arc<dyn RateSource>,
    base: String,
    cache: TtlCell<Arc<RateTable>>,
    refresh_lock: Mutex<()>,
}

impl RateService {
    pub fn new(source: Arc<dyn RateSource>, base: &str, clock: Arc<dyn Clock>) -> Self {
        Self {
            source,
            base: base.to_uppercase(),
            cache: TtlCell::new(RATE_TABLE_TTL, clock),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Returns the current rate table, fetching it if the cached copy expired.
    pub async fn rate_table(&self) -> Result<Snapshot<Arc<RateTable>>, CoreError> {
        if let Some(snapshot) = self.cache.fresh().await {
            return Ok(snapshot);
        }
        let _guard = self.refresh_lock.lock().await;
        if let Some(snapshot) = self.cache.fresh().await {
            return Ok(snapshot);
        }

        let fetched = self
            .source
            .fetch_rates(&self.base)
            .await
            .and_then(|table| {
                if table.is_empty() {
                    anyhow::bail!("No rates returned for base {}", self.base)
                }
                Ok(table)
            });

        match fetched {
            Ok(table) => {
                debug!(
                    base = %self.base,
                    count = table.len(),
                    as_of = ?table.as_of(),
                    "Rate table refreshed"
                );
                Ok(self.cache.replace(Arc::new(table)).await)
            }
            Err(e) => match self.cache.last().await {
                Some(mut previous) => {
                    warn!(
                        error = %e,
                        fetched_at = %previous.fetched_at,
                        "Rate refresh failed, serving previous rate table"
                    );
                    previous.freshness = Freshness::Stale;
                    Ok(previous)
                }
                None => Err(CoreError::rate_unavailable(
                    &self.base,
                    "*",
                    format!("{e:#}"),
                )),
            },
        }
    }
}

#[async_trait]
impl CurrencyRateProvider for RateService {
    async fn get_rate(&self, from: &str, to: &str) -> Result<f64, CoreError> {
        let from = from.trim().to_uppercase();
        let to = to.trim().to_uppercase();
        if from == to {
            return Ok(1.0);
        }

        let snapshot = self.rate_table().await.map_err(|e| match e {
            CoreError::RateUnavailable { reason, .. } => {
                CoreError::rate_unavailable(&from, &to, reason)
            }
            other => other,
        })?;

        snapshot.value.rate(&from, &to).ok_or_else(|| {
            CoreError::rate_unavailable(&from, &to, "currency not quoted by rate source")
        })
    }
}
