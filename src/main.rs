use anyhow::Result;
use chrono::NaiveDate;
use clap::{Args, CommandFactory, Parser, Subcommand};
use divcal::cli::calendar::CalendarArgs;
use divcal::cli::export::ExportArgs;
use divcal::cli::project::ProjectArgs;
use divcal::core::Horizon;
use divcal::core::log::init_logging;
use std::path::PathBuf;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
struct TableFilter {
    /// Only show companies whose name or ticker contains this text
    #[arg(short, long)]
    search: Option<String>,

    /// Earliest ex-dividend date to show (YYYY-MM-DD), defaults to tomorrow
    #[arg(long, conflicts_with = "all")]
    from: Option<NaiveDate>,

    /// Show all ex-dividend dates, including past ones
    #[arg(long)]
    all: bool,

    /// Display currency, overriding the configured one
    #[arg(long)]
    currency: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Display the upcoming dividend calendar
    Calendar {
        #[command(flatten)]
        filter: TableFilter,
    },
    /// Project dividend income for an investment in one company
    Project {
        /// Ticker symbol, e.g. KO
        #[arg(short, long)]
        symbol: String,

        /// Amount to invest, in the display currency
        #[arg(short, long, default_value_t = 10_000.0)]
        amount: f64,

        /// Horizons to project, comma separated (6mo, 1y, 2y, 5y)
        #[arg(long, value_delimiter = ',', value_parser = parse_horizon)]
        horizons: Vec<Horizon>,

        /// Display currency, overriding the configured one
        #[arg(long)]
        currency: Option<String>,
    },
    /// Export the dividend calendar as CSV
    Export {
        /// Output file, defaults to dividend_calendar_YYYYMMDD.csv
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        filter: TableFilter,
    },
}

fn parse_horizon(s: &str) -> Result<Horizon, String> {
    s.parse::<Horizon>().map_err(|e| e.to_string())
}

impl From<TableFilter> for CalendarArgs {
    fn from(filter: TableFilter) -> Self {
        CalendarArgs {
            search: filter.search,
            from: filter.from,
            all: filter.all,
            currency: filter.currency,
        }
    }
}

impl From<Commands> for divcal::AppCommand {
    fn from(cmd: Commands) -> divcal::AppCommand {
        match cmd {
            Commands::Calendar { filter } => divcal::AppCommand::Calendar(filter.into()),
            Commands::Project {
                symbol,
                amount,
                horizons,
                currency,
            } => divcal::AppCommand::Project(ProjectArgs {
                symbol,
                amount,
                horizons,
                currency,
            }),
            Commands::Export { output, filter } => divcal::AppCommand::Export(ExportArgs {
                output,
                search: filter.search,
                from: filter.from,
                all: filter.all,
                currency: filter.currency,
            }),
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => match cli.config_path.as_deref() {
            Some(path) => divcal::cli::setup::setup_at_path(path),
            None => divcal::cli::setup::setup(),
        },
        Some(cmd) => divcal::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
