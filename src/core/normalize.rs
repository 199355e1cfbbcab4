//! Converts the monetary fields of calendar rows into a display currency.

use crate::core::currency::CurrencyRateProvider;
use crate::core::dividend::SymbolRecord;
use crate::core::error::CoreError;
use std::collections::HashMap;

/// Returns a copy of `record` with its amounts multiplied by `rate` and
/// relabelled as `target`. Yield, dates and descriptive fields are kept.
pub fn convert_record(record: &SymbolRecord, target: &str, rate: f64) -> SymbolRecord {
    SymbolRecord {
        last_dividend: record.last_dividend * rate,
        estimated_price: record.estimated_price * rate,
        currency: target.to_string(),
        ..record.clone()
    }
}

/// Builds a new table with every row expressed in `target`.
///
/// Each row is converted from its own currency, so the result never mixes
/// currencies. The input is left untouched.
pub async fn convert(
    table: &[SymbolRecord],
    target: &str,
    rates: &(dyn CurrencyRateProvider + Send + Sync),
) -> Result<Vec<SymbolRecord>, CoreError> {
    let target = target.trim().to_uppercase();
    let mut rate_by_source: HashMap<String, f64> = HashMap::new();
    let mut converted = Vec::with_capacity(table.len());

    for record in table {
        let rate = match rate_by_source.get(&record.currency) {
            Some(rate) => *rate,
            None => {
                let rate = rates.get_rate(&record.currency, &target).await?;
                rate_by_source.insert(record.currency.clone(), rate);
                rate
            }
        };
        converted.push(convert_record(record, &target, rate));
    }

    Ok(converted)
}
