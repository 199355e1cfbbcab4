//! The default set of dividend-paying tickers tracked by the calendar.

use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Informational grouping. Has no effect on fetching or calculations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sector {
    Technology,
    Healthcare,
    Financials,
    ConsumerGoods,
    Energy,
    Utilities,
    Industrials,
    Telecom,
    Payments,
    RealEstate,
    Materials,
    FoodAndBeverage,
    AerospaceAndDefense,
    Other,
}

impl Display for Sector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Sector::Technology => "Technology",
                Sector::Healthcare => "Healthcare",
                Sector::Financials => "Financials",
                Sector::ConsumerGoods => "Consumer Goods",
                Sector::Energy => "Energy",
                Sector::Utilities => "Utilities",
                Sector::Industrials => "Industrials",
                Sector::Telecom => "Telecom",
                Sector::Payments => "Payments",
                Sector::RealEstate => "Real Estate",
                Sector::Materials => "Materials",
                Sector::FoodAndBeverage => "Food & Beverage",
                Sector::AerospaceAndDefense => "Aerospace & Defense",
                Sector::Other => "Other",
            }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    pub symbol: String,
    pub sector: Sector,
}

impl Listing {
    pub fn new(symbol: &str, sector: Sector) -> Self {
        Self {
            symbol: symbol.to_uppercase(),
            sector,
        }
    }
}

const TECHNOLOGY: &[&str] = &[
    "AAPL", "MSFT", "GOOGL", "AMZN", "TSLA", "NVDA", "META", "ORCL", "CRM", "ADBE", "INTC", "IBM",
    "CSCO", "PYPL", "NFLX", "AMD", "QCOM", "TXN", "AVGO", "NOW",
];

const HEALTHCARE: &[&str] = &[
    "JNJ", "PFE", "MRK", "ABBV", "UNH", "CVS", "WBA", "BMY", "LLY", "TMO", "ABT", "MDT", "GILD",
    "AMGN", "DHR", "SYK", "ZTS", "BDX", "BSX", "EW",
];

const FINANCIALS: &[&str] = &[
    "JPM", "BAC", "WFC", "GS", "MS", "C", "USB", "PNC", "TFC", "COF", "AXP", "BLK", "SCHW", "CB",
    "MMC", "AIG", "PRU", "MET", "AFL", "ALL",
];

const CONSUMER_GOODS: &[&str] = &[
    "PG", "KO", "PEP", "WMT", "COST", "TGT", "HD", "LOW", "MCD", "SBUX", "NKE", "DIS", "CL", "KMB",
    "GIS", "K", "HSY", "MKC", "CPB", "CAG",
];

const ENERGY: &[&str] = &[
    "XOM", "CVX", "COP", "EOG", "SLB", "PSX", "VLO", "MPC", "KMI", "OKE", "EPD", "ET", "WMB", "ENB",
    "TRP", "SU", "CNQ", "IMO", "CVE", "HES",
];

const UTILITIES: &[&str] = &[
    "NEE", "DUK", "SO", "D", "EXC", "SRE", "AEP", "XEL", "PEG", "ED", "ES", "FE", "ETR", "WEC",
    "DTE", "PPL", "CMS", "NI", "LNT", "ATO",
];

const INDUSTRIALS: &[&str] = &[
    "GE", "MMM", "HON", "UPS", "CAT", "DE", "BA", "LMT", "RTX", "GD", "NOC", "EMR", "ITW", "PH",
    "ROK", "DOV", "ETN", "CMI", "IR", "JCI",
];

const TELECOM: &[&str] = &["T", "VZ", "TMUS", "CHTR", "CMCSA"];

const PAYMENTS: &[&str] = &["V", "MA", "PYPL", "SQ", "FIS", "FISV"];

const REAL_ESTATE: &[&str] = &[
    "AMT", "PLD", "CCI", "EQIX", "SPG", "O", "WELL", "EXR", "AVB", "EQR",
];

const MATERIALS: &[&str] = &[
    "LIN", "APD", "ECL", "SHW", "DD", "DOW", "PPG", "NEM", "FCX", "NUE",
];

const FOOD_AND_BEVERAGE: &[&str] = &["MDLZ", "KHC", "STZ", "TAP", "TSN", "HRL", "SJM", "BF.B"];

const AEROSPACE_AND_DEFENSE: &[&str] = &["LHX", "TDG", "HWM", "TXT", "CW", "WWD"];

const GROUPS: &[(Sector, &[&str])] = &[
    (Sector::Technology, TECHNOLOGY),
    (Sector::Healthcare, HEALTHCARE),
    (Sector::Financials, FINANCIALS),
    (Sector::ConsumerGoods, CONSUMER_GOODS),
    (Sector::Energy, ENERGY),
    (Sector::Utilities, UTILITIES),
    (Sector::Industrials, INDUSTRIALS),
    (Sector::Telecom, TELECOM),
    (Sector::Payments, PAYMENTS),
    (Sector::RealEstate, REAL_ESTATE),
    (Sector::Materials, MATERIALS),
    (Sector::FoodAndBeverage, FOOD_AND_BEVERAGE),
    (Sector::AerospaceAndDefense, AEROSPACE_AND_DEFENSE),
];

/// Returns the built-in universe, one listing per ticker.
///
/// A ticker that appears in more than one group keeps its first sector.
pub fn default_universe() -> Vec<Listing> {
    let mut listings: Vec<Listing> = Vec::new();
    for (sector, symbols) in GROUPS {
        for symbol in *symbols {
            if !listings.iter().any(|l| l.symbol == *symbol) {
                listings.push(Listing::new(symbol, *sector));
            }
        }
    }
    listings
}

/// Builds listings for a user-supplied symbol list, borrowing sectors from
/// the built-in universe where the ticker is known.
pub fn universe_from_symbols(symbols: &[String]) -> Vec<Listing> {
    let known = default_universe();
    let mut listings: Vec<Listing> = Vec::new();
    for symbol in symbols {
        let symbol = symbol.trim().to_uppercase();
        if symbol.is_empty() || listings.iter().any(|l| l.symbol == symbol) {
            continue;
        }
        let sector = known
            .iter()
            .find(|l| l.symbol == symbol)
            .map_or(Sector::Other, |l| l.sector);
        listings.push(Listing::new(&symbol, sector));
    }
    listings
}
