use super::{DisplayTable, default_min_ex_date, load_display_table, ui};
use crate::App;
use crate::core::dividend::PriceSource;
use crate::core::filter::HIGH_YIELD_THRESHOLD;
use crate::core::{CalendarFilter, CalendarStats, SymbolRecord};
use anyhow::Result;
use chrono::NaiveDate;
use comfy_table::Cell;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct CalendarArgs {
    pub search: Option<String>,
    pub from: Option<NaiveDate>,
    pub all: bool,
    pub currency: Option<String>,
}

impl CalendarArgs {
    pub fn filter(&self) -> CalendarFilter {
        let min_ex_date = if self.all {
            None
        } else {
            Some(self.from.unwrap_or_else(default_min_ex_date))
        };
        CalendarFilter {
            query: self.search.clone(),
            min_ex_date,
        }
    }
}

pub async fn run(app: &App, args: &CalendarArgs) -> Result<()> {
    let table = load_display_table(app, args.currency.as_deref()).await?;
    let filter = args.filter();
    debug!(?filter, "Applying calendar filter");

    let mut records = filter.apply(&table.records);
    records.sort_by_key(|r| r.ex_dividend_date);

    println!("{}", display_stats(&CalendarStats::from_records(&records), &table.currency));
    ui::print_separator();

    if records.is_empty() {
        println!(
            "{}",
            ui::style_text("No companies match the applied filters.", ui::StyleType::Warning)
        );
        return Ok(());
    }

    println!("{}", display_calendar(&records, &table));
    Ok(())
}

fn display_stats(stats: &CalendarStats, currency: &str) -> String {
    let average_yield = ui::format_optional(stats.average_yield, |y| format!("{y:.2}%"));
    let average_dividend =
        ui::format_optional(stats.average_dividend, |d| format!("{d:.3} {currency}"));
    let high_yield_label = format!("Yield > {HIGH_YIELD_THRESHOLD:.0}%");

    [
        ("Companies", stats.count.to_string()),
        ("Average yield", average_yield),
        ("Average dividend", average_dividend),
        (high_yield_label.as_str(), stats.high_yield_count.to_string()),
    ]
    .iter()
    .map(|(label, value)| {
        format!(
            "{}: {}",
            ui::style_text(label, ui::StyleType::Label),
            ui::style_text(value, ui::StyleType::Value)
        )
    })
    .collect::<Vec<_>>()
    .join("   ")
}

fn display_calendar(records: &[SymbolRecord], table: &DisplayTable) -> String {
    let currency = &table.currency;
    let mut output = format!(
        "{}\n\n",
        ui::style_text("Dividend Calendar", ui::StyleType::Title)
    );

    let mut grid = ui::new_styled_table();
    grid.set_header(vec![
        ui::header_cell("Company"),
        ui::header_cell("Symbol"),
        ui::header_cell("Sector"),
        ui::header_cell("Ex-Dividend"),
        ui::header_cell(&format!("Dividend ({currency})")),
        ui::header_cell("Frequency"),
        ui::header_cell("Payment"),
        ui::header_cell("Yield"),
        ui::header_cell(&format!("Est. Price ({currency})")),
        ui::header_cell("Reliability"),
    ]);

    for record in records {
        grid.add_row(vec![
            Cell::new(&record.company_name),
            Cell::new(&record.symbol),
            Cell::new(record.sector.to_string()),
            Cell::new(record.ex_dividend_date.format("%Y-%m-%d")),
            ui::number_cell(format!("{:.4}", record.last_dividend)),
            Cell::new(record.frequency.to_string()),
            Cell::new(record.payment_date.format("%Y-%m-%d")),
            ui::yield_cell(record.dividend_yield, HIGH_YIELD_THRESHOLD),
            ui::number_cell(price_text(record)),
            Cell::new(record.reliability_stars()),
        ]);
    }
    output.push_str(&grid.to_string());

    let as_of = table
        .fetched_at
        .with_timezone(&chrono::Local)
        .format("%Y-%m-%d %H:%M");
    let mut note = if table.stale {
        format!("Data as of {as_of} (stale). Dates are estimated from past payments.")
    } else {
        format!("Data as of {as_of}. Dates are estimated from past payments.")
    };
    if records
        .iter()
        .any(|r| r.price_source == PriceSource::Derived)
    {
        note.push_str("\n* Price derived from the reported yield.");
    }
    output.push_str(&format!("\n{}", ui::style_text(&note, ui::StyleType::Subtle)));
    output
}

fn price_text(record: &SymbolRecord) -> String {
    match record.price_source {
        PriceSource::Reported => format!("{:.2}", record.estimated_price),
        PriceSource::Derived => format!("{:.2}*", record.estimated_price),
    }
}
