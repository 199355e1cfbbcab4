use super::{load_display_table, ui};
use crate::App;
use crate::core::{
    CoreError, HoldingEstimate, Horizon, ProjectionResult, SymbolRecord, estimate_holding, project,
};
use anyhow::Result;
use comfy_table::Cell;
use tracing::info;

#[derive(Debug, Clone)]
pub struct ProjectArgs {
    pub symbol: String,
    pub amount: f64,
    pub horizons: Vec<Horizon>,
    pub currency: Option<String>,
}

pub async fn run(app: &App, args: &ProjectArgs) -> Result<()> {
    info!(symbol = %args.symbol, amount = args.amount, "Projecting dividend income");

    let table = load_display_table(app, args.currency.as_deref()).await?;
    let record = find_record(&table.records, &args.symbol)?;

    let horizons = if args.horizons.is_empty() {
        Horizon::ALL.to_vec()
    } else {
        args.horizons.clone()
    };
    let estimate = estimate_holding(args.amount, record)?;
    let projections = project(args.amount, record, &horizons)?;

    println!(
        "{}\n",
        ui::style_text(
            &format!("{} ({})", record.company_name, record.symbol),
            ui::StyleType::Title
        )
    );
    println!("{}", display_estimate(args.amount, &estimate, &table.currency));
    ui::print_separator();
    println!(
        "{}",
        display_projection(&estimate, &projections, &table.currency)
    );
    println!("\n{}", display_details(record));
    println!(
        "\n{}",
        ui::style_text(
            "Projections assume the current yield holds, with no reinvestment or dividend \
             growth. Prices are estimates. Future dividends are not guaranteed.",
            ui::StyleType::Subtle
        )
    );
    Ok(())
}

fn find_record<'a>(records: &'a [SymbolRecord], symbol: &str) -> Result<&'a SymbolRecord> {
    let symbol = symbol.trim();
    records
        .iter()
        .find(|r| r.symbol.eq_ignore_ascii_case(symbol))
        .ok_or_else(|| {
            CoreError::InvalidInput(format!("{symbol} is not in the dividend calendar")).into()
        })
}

fn display_estimate(amount: f64, estimate: &HoldingEstimate, currency: &str) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Parameter"), ui::header_cell("Value")]);
    table.add_row(vec![
        Cell::new("Amount invested"),
        ui::number_cell(format!("{amount:.2} {currency}")),
    ]);
    table.add_row(vec![
        Cell::new("Estimated price per share"),
        ui::number_cell(format!("{:.2} {currency}", estimate.estimated_price)),
    ]);
    table.add_row(vec![
        Cell::new("Shares purchasable"),
        ui::number_cell(format!("{:.0}", estimate.shares.floor())),
    ]);
    table.add_row(vec![
        Cell::new("Dividend per payment"),
        ui::number_cell(format!("{:.2} {currency}", estimate.dividend_per_payment)),
    ]);
    table.add_row(vec![
        Cell::new("Payments per year"),
        ui::number_cell(estimate.payments_per_year.to_string()),
    ]);
    table.to_string()
}

fn display_projection(
    estimate: &HoldingEstimate,
    projections: &[ProjectionResult],
    currency: &str,
) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Period"),
        ui::header_cell(&format!("Income ({currency})")),
        ui::header_cell("Yield on Principal"),
    ]);

    table.add_row(vec![
        Cell::new("Single payment"),
        ui::number_cell(format!("{:.2}", estimate.dividend_per_payment)),
        Cell::new("").set_alignment(comfy_table::CellAlignment::Right),
    ]);
    for projection in projections {
        table.add_row(vec![
            Cell::new(projection.horizon.to_string()),
            ui::number_cell(format!("{:.2}", projection.projected_income)),
            ui::number_cell(format!("{:.2}%", projection.yield_on_principal * 100.0)),
        ]);
    }

    format!(
        "{}\n\n{}",
        ui::style_text("Projected Dividend Income", ui::StyleType::Title),
        table
    )
}

fn display_details(record: &SymbolRecord) -> String {
    [
        ("Frequency", record.frequency.to_string()),
        (
            "Next ex-dividend",
            record.ex_dividend_date.format("%Y-%m-%d").to_string(),
        ),
        ("Reliability", record.reliability_stars()),
        ("Annual yield", format!("{:.2}%", record.dividend_yield)),
    ]
    .iter()
    .map(|(label, value)| format!("{}: {}", ui::style_text(label, ui::StyleType::Label), value))
    .collect::<Vec<_>>()
    .join("\n")
}
