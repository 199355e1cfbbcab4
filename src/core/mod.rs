//! Core business logic abstractions

pub mod cache;
pub mod config;
pub mod currency;
pub mod dividend;
pub mod error;
pub mod filter;
pub mod log;
pub mod normalize;
pub mod projection;
pub mod universe;

// Re-export main types for cleaner imports
pub use cache::{Clock, Freshness, ManualClock, Snapshot, SystemClock};
pub use currency::{CurrencyRateProvider, RateService, RateSource, RateTable};
pub use dividend::{DividendCalendar, DividendProvider, DividendQuote, DividendTable, SymbolRecord};
pub use error::CoreError;
pub use filter::{CalendarFilter, CalendarStats};
pub use projection::{Horizon, HoldingEstimate, ProjectionResult, estimate_holding, project};
