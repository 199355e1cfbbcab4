//! Table filtering and summary statistics for the calendar view.

use crate::core::dividend::SymbolRecord;
use chrono::NaiveDate;

/// Yield above which a symbol counts as high-yield, in percent.
pub const HIGH_YIELD_THRESHOLD: f64 = 5.0;

#[derive(Debug, Clone, Default)]
pub struct CalendarFilter {
    /// Case-insensitive substring of the company name or ticker.
    pub query: Option<String>,
    /// Earliest ex-dividend date to keep, inclusive.
    pub min_ex_date: Option<NaiveDate>,
}

impl CalendarFilter {
    pub fn matches(&self, record: &SymbolRecord) -> bool {
        let query_match = match self.query.as_deref().map(str::trim) {
            Some(query) if !query.is_empty() => {
                let query = query.to_lowercase();
                record.company_name.to_lowercase().contains(&query)
                    || record.symbol.to_lowercase().contains(&query)
            }
            _ => true,
        };
        let date_match = self
            .min_ex_date
            .is_none_or(|min| record.ex_dividend_date >= min);
        query_match && date_match
    }

    pub fn apply(&self, records: &[SymbolRecord]) -> Vec<SymbolRecord> {
        records
            .iter()
            .filter(|r| self.matches(r))
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CalendarStats {
    pub count: usize,
    pub average_yield: Option<f64>,
    pub average_dividend: Option<f64>,
    pub high_yield_count: usize,
}

impl CalendarStats {
    pub fn from_records(records: &[SymbolRecord]) -> Self {
        let count = records.len();
        let mean = |f: fn(&SymbolRecord) -> f64| {
            (count > 0).then(|| records.iter().map(f).sum::<f64>() / count as f64)
        };
        CalendarStats {
            count,
            average_yield: mean(|r| r.dividend_yield),
            average_dividend: mean(|r| r.last_dividend),
            high_yield_count: records
                .iter()
                .filter(|r| r.dividend_yield > HIGH_YIELD_THRESHOLD)
                .count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dividend::{Frequency, PriceSource};
    use crate::core::universe::Sector;
    use approx::assert_relative_eq;

    fn record(
        symbol: &str,
        name: &str,
        ex_date: (i32, u32, u32),
        dividend_yield: f64,
    ) -> SymbolRecord {
        let ex_dividend_date = NaiveDate::from_ymd_opt(ex_date.0, ex_date.1, ex_date.2).unwrap();
        SymbolRecord {
            symbol: symbol.to_string(),
            company_name: name.to_string(),
            sector: Sector::Energy,
            dividend_yield,
            last_dividend: dividend_yield / 10.0,
            ex_dividend_date,
            payment_date: ex_dividend_date,
            frequency: Frequency::Quarterly,
            estimated_price: 100.0,
            price_source: PriceSource::Reported,
            reliability: 3,
            currency: "USD".to_string(),
        }
    }

    fn table() -> Vec<SymbolRecord> {
        vec![
            record("XOM", "Exxon Mobil Corporation", (2025, 5, 15), 3.4),
            record("CVX", "Chevron Corporation", (2025, 5, 19), 4.6),
            record("ET", "Energy Transfer LP", (2025, 8, 11), 7.2),
            record("OKE", "ONEOK, Inc.", (2025, 4, 30), 5.1),
        ]
    }

    #[test]
    fn test_query_matches_name_or_symbol() {
        let filter = CalendarFilter {
            query: Some("corp".to_string()),
            ..Default::default()
        };
        let symbols: Vec<_> = filter.apply(&table()).into_iter().map(|r| r.symbol).collect();
        assert_eq!(symbols, vec!["XOM", "CVX"]);

        let filter = CalendarFilter {
            query: Some("oke".to_string()),
            ..Default::default()
        };
        assert_eq!(filter.apply(&table()).len(), 1);
    }

    #[test]
    fn test_blank_query_matches_everything() {
        let filter = CalendarFilter {
            query: Some("  ".to_string()),
            ..Default::default()
        };
        assert_eq!(filter.apply(&table()).len(), 4);
        assert_eq!(CalendarFilter::default().apply(&table()).len(), 4);
    }

    #[test]
    fn test_min_ex_date_is_inclusive() {
        let filter = CalendarFilter {
            query: None,
            min_ex_date: NaiveDate::from_ymd_opt(2025, 5, 15),
        };
        let symbols: Vec<_> = filter.apply(&table()).into_iter().map(|r| r.symbol).collect();
        assert_eq!(symbols, vec!["XOM", "CVX", "ET"]);
    }

    #[test]
    fn test_stats() {
        let stats = CalendarStats::from_records(&table());
        assert_eq!(stats.count, 4);
        assert_relative_eq!(stats.average_yield.unwrap(), 5.075);
        assert_relative_eq!(stats.average_dividend.unwrap(), 0.5075);
        assert_eq!(stats.high_yield_count, 2);

        let empty = CalendarStats::from_records(&[]);
        assert_eq!(empty.count, 0);
        assert!(empty.average_yield.is_none());
        assert!(empty.average_dividend.is_none());
        assert_eq!(empty.high_yield_count, 0);
    }
}
