pub mod cli;
pub mod core;
pub mod providers;

use crate::cli::calendar::CalendarArgs;
use crate::cli::export::ExportArgs;
use crate::cli::project::ProjectArgs;
use crate::core::config::AppConfig;
use crate::core::{DividendCalendar, RateService, SystemClock};
use crate::providers::frankfurter::FrankfurterRateSource;
use crate::providers::yahoo_finance::YahooDividendProvider;
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info};

/// Currency the exchange rate table is quoted against.
pub const RATE_BASE_CURRENCY: &str = "USD";

/// Shared services the commands run against.
pub struct App {
    pub calendar: DividendCalendar,
    pub rates: RateService,
    /// Display currency when a command does not override it.
    pub currency: String,
}

impl App {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let clock = Arc::new(SystemClock);
        let dividend_provider = YahooDividendProvider::new(config.providers.yahoo_base_url())?;
        let rate_source = FrankfurterRateSource::new(config.providers.frankfurter_base_url())?;

        Ok(App {
            calendar: DividendCalendar::new(
                Arc::new(dividend_provider),
                config.listings(),
                clock.clone(),
            ),
            rates: RateService::new(Arc::new(rate_source), RATE_BASE_CURRENCY, clock),
            currency: config.currency.trim().to_uppercase(),
        })
    }
}

pub enum AppCommand {
    Calendar(CalendarArgs),
    Project(ProjectArgs),
    Export(ExportArgs),
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("Dividend calendar starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let app = App::from_config(&config)?;
    debug!(symbols = app.calendar.listings().len(), "Tracking universe");

    match command {
        AppCommand::Calendar(args) => cli::calendar::run(&app, &args).await,
        AppCommand::Project(args) => cli::project::run(&app, &args).await,
        AppCommand::Export(args) => cli::export::run(&app, &args).await,
    }
}
