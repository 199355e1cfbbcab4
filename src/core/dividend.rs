//! Dividend records, the provider abstraction, and the cached calendar table.

use crate::core::cache::{Clock, Freshness, Snapshot, TtlCell};
use crate::core::error::CoreError;
use crate::core::universe::{Listing, Sector};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration as Days, NaiveDate};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// How long a fetched dividend table is served without refetching.
pub const DIVIDEND_TABLE_TTL: Duration = Duration::from_secs(60 * 60);

const MAX_CONCURRENT_FETCHES: usize = 8;
const FREQUENCY_WINDOW: usize = 10;
const PAYMENT_DELAY_DAYS: i64 = 21;

/// A single historical dividend payment as reported upstream.
#[derive(Debug, Clone, PartialEq)]
pub struct DividendPayment {
    pub date: NaiveDate,
    pub amount: f64,
}

/// The provider fields the calendar depends on, before validation.
#[derive(Debug, Clone, Default)]
pub struct DividendQuote {
    pub company_name: Option<String>,
    pub currency: Option<String>,
    pub price: Option<f64>,
    /// Annualized yield in percent, if the provider reports one.
    pub reported_yield: Option<f64>,
    pub market_cap: Option<f64>,
    pub payout_ratio: Option<f64>,
    pub dividends: Vec<DividendPayment>,
}

#[async_trait]
pub trait DividendProvider: Send + Sync {
    async fn fetch_quote(&self, symbol: &str) -> Result<DividendQuote>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Frequency {
    Monthly,
    Quarterly,
    SemiAnnual,
    Annual,
    Irregular,
    Unknown,
}

impl Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Frequency::Monthly => "Monthly",
                Frequency::Quarterly => "Quarterly",
                Frequency::SemiAnnual => "Semi-annual",
                Frequency::Annual => "Annual",
                Frequency::Irregular => "Irregular",
                Frequency::Unknown => "N/A",
            }
        )
    }
}

impl Frequency {
    /// Classifies a payment schedule from the mean gap between dates.
    /// Expects dates in ascending order.
    pub fn detect(dates: &[NaiveDate]) -> Frequency {
        let (Some(first), Some(last)) = (dates.first(), dates.last()) else {
            return Frequency::Unknown;
        };
        if dates.len() < 2 {
            return Frequency::Unknown;
        }
        let mean_gap = (*last - *first).num_days() as f64 / (dates.len() - 1) as f64;
        if mean_gap <= 45.0 {
            Frequency::Monthly
        } else if mean_gap <= 100.0 {
            Frequency::Quarterly
        } else if mean_gap <= 200.0 {
            Frequency::SemiAnnual
        } else if mean_gap <= 400.0 {
            Frequency::Annual
        } else {
            Frequency::Irregular
        }
    }

    /// Payments per year used for yield and income figures. Irregular and
    /// unknown schedules count as one payment, so a yield computed from the
    /// last dividend never assumes payments that were not observed.
    pub fn payments_per_year(&self) -> u32 {
        match self {
            Frequency::Monthly => 12,
            Frequency::Quarterly => 4,
            Frequency::SemiAnnual => 2,
            Frequency::Annual | Frequency::Irregular | Frequency::Unknown => 1,
        }
    }

    pub fn next_ex_date(&self, last: NaiveDate) -> NaiveDate {
        let days = match self {
            Frequency::Monthly => 30,
            Frequency::Quarterly => 90,
            Frequency::SemiAnnual => 180,
            Frequency::Annual => 365,
            Frequency::Irregular | Frequency::Unknown => 90,
        };
        last + Days::days(days)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceSource {
    Reported,
    Derived,
}

/// One row of the dividend calendar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolRecord {
    pub symbol: String,
    pub company_name: String,
    pub sector: Sector,
    /// Annualized, in percent. Never affected by currency conversion.
    pub dividend_yield: f64,
    pub last_dividend: f64,
    /// Estimated next ex-dividend date.
    pub ex_dividend_date: NaiveDate,
    pub payment_date: NaiveDate,
    pub frequency: Frequency,
    pub estimated_price: f64,
    pub price_source: PriceSource,
    /// 0 to 5 stars.
    pub reliability: u8,
    pub currency: String,
}

impl SymbolRecord {
    /// Validates a provider quote and derives the calendar fields.
    ///
    /// Returns `None` when the quote cannot produce a usable row: no valid
    /// payments, or neither a price nor a positive reported yield.
    pub fn from_quote(listing: &Listing, quote: &DividendQuote) -> Option<SymbolRecord> {
        let mut payments: Vec<&DividendPayment> = quote
            .dividends
            .iter()
            .filter(|p| p.amount.is_finite() && p.amount >= 0.0)
            .collect();
        payments.sort_by_key(|p| p.date);
        let last = *payments.last()?;

        let recent: Vec<NaiveDate> = payments
            .iter()
            .skip(payments.len().saturating_sub(FREQUENCY_WINDOW))
            .map(|p| p.date)
            .collect();
        let frequency = Frequency::detect(&recent);

        let price = quote.price.filter(|p| p.is_finite() && *p > 0.0);
        let (dividend_yield, estimated_price, price_source) = match price {
            Some(price) => (
                last.amount * frequency.payments_per_year() as f64 / price * 100.0,
                price,
                PriceSource::Reported,
            ),
            None => {
                let reported = quote
                    .reported_yield
                    .filter(|y| y.is_finite() && *y > 0.0)?;
                let derived = estimate_price(last.amount, reported)?;
                (reported, derived, PriceSource::Derived)
            }
        };

        let ex_dividend_date = frequency.next_ex_date(last.date);
        let company_name = quote
            .company_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(&listing.symbol)
            .to_string();
        let currency = quote
            .currency
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or("USD")
            .to_uppercase();

        Some(SymbolRecord {
            symbol: listing.symbol.clone(),
            company_name,
            sector: listing.sector,
            dividend_yield,
            last_dividend: last.amount,
            ex_dividend_date,
            payment_date: ex_dividend_date + Days::days(PAYMENT_DELAY_DAYS),
            frequency,
            estimated_price,
            price_source,
            reliability: reliability_score(payments.len(), quote.market_cap, quote.payout_ratio),
            currency,
        })
    }

    /// Reliability rendered as five filled or empty stars.
    pub fn reliability_stars(&self) -> String {
        let filled = usize::from(self.reliability.min(5));
        format!("{}{}", "★".repeat(filled), "☆".repeat(5 - filled))
    }
}

/// Share price implied by a dividend and an annual yield, assuming four
/// payments a year.
pub fn estimate_price(last_dividend: f64, yield_pct: f64) -> Option<f64> {
    if yield_pct.is_nan() || yield_pct <= 0.0 {
        return None;
    }
    let price = last_dividend * 4.0 / (yield_pct / 100.0);
    (price.is_finite() && price > 0.0).then_some(price)
}

/// Scores dividend dependability from history length, company size and
/// payout sustainability. Capped at 5.
pub fn reliability_score(
    payment_count: usize,
    market_cap: Option<f64>,
    payout_ratio: Option<f64>,
) -> u8 {
    let mut score = match payment_count {
        n if n >= 20 => 3,
        n if n >= 10 => 2,
        n if n >= 4 => 1,
        _ => 0,
    };
    match market_cap {
        Some(cap) if cap > 100_000_000_000.0 => score += 2,
        Some(cap) if cap > 10_000_000_000.0 => score += 1,
        _ => {}
    }
    match payout_ratio {
        Some(ratio) if ratio != 0.0 && ratio < 0.6 => score += 2,
        Some(ratio) if ratio != 0.0 && ratio < 0.8 => score += 1,
        _ => {}
    }
    score.min(5)
}

pub type DividendTable = Arc<Vec<SymbolRecord>>;

/// Read-through cache over the provider for the whole configured universe.
pub struct DividendCalendar {
    provider: Arc<dyn DividendProvider>,
    listings: Vec<Listing>,
    cache: TtlCell<DividendTable>,
    refresh_lock: Mutex<()>,
}

impl DividendCalendar {
    pub fn new(
        provider: Arc<dyn DividendProvider>,
        listings: Vec<Listing>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            provider,
            listings,
            cache: TtlCell::new(DIVIDEND_TABLE_TTL, clock),
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn listings(&self) -> &[Listing] {
        &self.listings
    }

    /// Returns the dividend table, fetching it when the cached copy is older
    /// than [`DIVIDEND_TABLE_TTL`].
    ///
    /// When a fetch resolves no symbols, the previous table is returned
    /// marked stale. Fails only when there is nothing to fall back on.
    pub async fn get_dividend_table(&self) -> Result<Snapshot<DividendTable>, CoreError> {
        if let Some(snapshot) = self.cache.fresh().await {
            return Ok(snapshot);
        }
        let _guard = self.refresh_lock.lock().await;
        // Another caller may have refreshed while we waited for the lock.
        if let Some(snapshot) = self.cache.fresh().await {
            return Ok(snapshot);
        }
        self.fetch_and_store().await
    }

    /// Refetches the table regardless of its age.
    pub async fn refresh(&self) -> Result<Snapshot<DividendTable>, CoreError> {
        let _guard = self.refresh_lock.lock().await;
        self.fetch_and_store().await
    }

    async fn fetch_and_store(&self) -> Result<Snapshot<DividendTable>, CoreError> {
        let records = self.fetch_all().await;

        if records.is_empty() {
            return match self.cache.last().await {
                Some(mut previous) => {
                    warn!(
                        fetched_at = %previous.fetched_at,
                        "No symbols resolved, serving previous dividend table"
                    );
                    previous.freshness = Freshness::Stale;
                    Ok(previous)
                }
                None => Err(CoreError::DataUnavailable(format!(
                    "none of the {} configured symbols returned dividend data",
                    self.listings.len()
                ))),
            };
        }

        info!(
            resolved = records.len(),
            total = self.listings.len(),
            "Dividend table refreshed"
        );
        Ok(self.cache.replace(Arc::new(records)).await)
    }

    async fn fetch_all(&self) -> Vec<SymbolRecord> {
        let fetches: Vec<_> = self
            .listings
            .iter()
            .map(|listing| self.fetch_record(listing))
            .collect();
        stream::iter(fetches)
            .buffered(MAX_CONCURRENT_FETCHES)
            .filter_map(futures::future::ready)
            .collect()
            .await
    }

    async fn fetch_record(&self, listing: &Listing) -> Option<SymbolRecord> {
        match self.provider.fetch_quote(&listing.symbol).await {
            Ok(quote) => {
                let record = SymbolRecord::from_quote(listing, &quote);
                if record.is_none() {
                    debug!(symbol = %listing.symbol, "No usable dividend data, skipping");
                }
                record
            }
            Err(e) => {
                warn!(symbol = %listing.symbol, error = %e, "Failed to fetch dividend data");
                None
            }
        }
    }
}
