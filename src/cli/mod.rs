pub mod calendar;
pub mod export;
pub mod project;
pub mod setup;
pub mod ui;

use crate::App;
use crate::core::{CoreError, DividendTable, Snapshot, SymbolRecord, normalize};
use anyhow::Result;
use chrono::{DateTime, Local, NaiveDate, Utc};

/// The calendar table in display currency, as one command sees it.
pub struct DisplayTable {
    pub records: Vec<SymbolRecord>,
    pub currency: String,
    pub fetched_at: DateTime<Utc>,
    pub stale: bool,
}

async fn fetch_converted(
    app: &App,
    currency: &str,
) -> Result<(Snapshot<DividendTable>, Vec<SymbolRecord>), CoreError> {
    let snapshot = app.calendar.get_dividend_table().await?;
    let records = normalize::convert(&snapshot.value, currency, &app.rates).await?;
    Ok((snapshot, records))
}

/// Fetches the dividend table and converts it for display.
///
/// Prints an explicit unavailable or stale notice, so callers only deal with
/// rendering the rows.
pub async fn load_display_table(app: &App, currency: Option<&str>) -> Result<DisplayTable> {
    let currency = currency.unwrap_or(&app.currency).trim().to_uppercase();

    let pb = ui::new_spinner("Fetching dividend data...");
    let result = fetch_converted(app, &currency).await;
    pb.finish_and_clear();

    let (snapshot, records) = match result {
        Ok(fetched) => fetched,
        Err(e) => {
            if let CoreError::DataUnavailable(_) = e {
                println!(
                    "{}",
                    ui::style_text(
                        "Dividend data unavailable. Check your connection and try again.",
                        ui::StyleType::Error
                    )
                );
            }
            return Err(e.into());
        }
    };

    if snapshot.is_stale() {
        let fetched_at = snapshot.fetched_at.with_timezone(&Local);
        println!(
            "{}",
            ui::style_text(
                &format!(
                    "Showing cached data from {}; the latest refresh failed.",
                    fetched_at.format("%Y-%m-%d %H:%M")
                ),
                ui::StyleType::Warning
            )
        );
    }

    Ok(DisplayTable {
        records,
        currency,
        fetched_at: snapshot.fetched_at,
        stale: snapshot.is_stale(),
    })
}

/// The earliest ex-dividend date shown by default: tomorrow.
pub fn default_min_ex_date() -> NaiveDate {
    Local::now().date_naive() + chrono::Duration::days(1)
}
