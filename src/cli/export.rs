use super::{default_min_ex_date, load_display_table, ui};
use crate::App;
use crate::core::{CalendarFilter, SymbolRecord};
use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone, Default)]
pub struct ExportArgs {
    pub output: Option<PathBuf>,
    pub search: Option<String>,
    pub from: Option<NaiveDate>,
    pub all: bool,
    pub currency: Option<String>,
}

impl ExportArgs {
    pub fn filter(&self) -> CalendarFilter {
        CalendarFilter {
            query: self.search.clone(),
            min_ex_date: (!self.all).then(|| self.from.unwrap_or_else(default_min_ex_date)),
        }
    }

    fn output_path(&self) -> PathBuf {
        self.output.clone().unwrap_or_else(default_file_name)
    }
}

fn default_file_name() -> PathBuf {
    PathBuf::from(format!(
        "dividend_calendar_{}.csv",
        Local::now().format("%Y%m%d")
    ))
}

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    #[serde(rename = "Company Name")]
    company_name: &'a str,
    #[serde(rename = "Symbol")]
    symbol: &'a str,
    #[serde(rename = "Sector")]
    sector: String,
    #[serde(rename = "Ex-Dividend Date")]
    ex_dividend_date: String,
    #[serde(rename = "Dividend")]
    dividend: String,
    #[serde(rename = "Frequency")]
    frequency: String,
    #[serde(rename = "Payment Date")]
    payment_date: String,
    #[serde(rename = "Yield (%)")]
    dividend_yield: String,
    #[serde(rename = "Estimated Price")]
    estimated_price: String,
    #[serde(rename = "Currency")]
    currency: &'a str,
    #[serde(rename = "Reliability")]
    reliability: u8,
}

impl<'a> From<&'a SymbolRecord> for CsvRow<'a> {
    fn from(record: &'a SymbolRecord) -> Self {
        CsvRow {
            company_name: &record.company_name,
            symbol: &record.symbol,
            sector: record.sector.to_string(),
            ex_dividend_date: record.ex_dividend_date.format("%Y-%m-%d").to_string(),
            dividend: format!("{:.4}", record.last_dividend),
            frequency: record.frequency.to_string(),
            payment_date: record.payment_date.format("%Y-%m-%d").to_string(),
            dividend_yield: format!("{:.2}", record.dividend_yield),
            estimated_price: format!("{:.2}", record.estimated_price),
            currency: &record.currency,
            reliability: record.reliability,
        }
    }
}

/// Writes the records as CSV with a header row, one row per record.
pub fn write_csv<W: Write>(records: &[SymbolRecord], writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    if records.is_empty() {
        // serde only emits headers alongside the first row
        csv_writer.write_record([
            "Company Name",
            "Symbol",
            "Sector",
            "Ex-Dividend Date",
            "Dividend",
            "Frequency",
            "Payment Date",
            "Yield (%)",
            "Estimated Price",
            "Currency",
            "Reliability",
        ])?;
    }
    for record in records {
        csv_writer.serialize(CsvRow::from(record))?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub async fn run(app: &App, args: &ExportArgs) -> Result<()> {
    let table = load_display_table(app, args.currency.as_deref()).await?;
    let mut records = args.filter().apply(&table.records);
    records.sort_by_key(|r| r.ex_dividend_date);

    let path = args.output_path();
    let file = File::create(&path)
        .with_context(|| format!("Failed to create export file: {}", path.display()))?;
    write_csv(&records, file)
        .with_context(|| format!("Failed to write export file: {}", path.display()))?;

    info!(rows = records.len(), path = %path.display(), "Exported dividend calendar");
    println!(
        "{} {} {}",
        ui::style_text("Exported", ui::StyleType::Label),
        ui::style_text(&records.len().to_string(), ui::StyleType::Value),
        ui::style_text(&format!("rows to {}", path.display()), ui::StyleType::Label),
    );
    Ok(())
}
