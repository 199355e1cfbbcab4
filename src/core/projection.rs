//! Linear dividend income projection.
//!
//! Income accrues proportionally to elapsed time at the record's current
//! yield. Reinvestment and dividend growth are not modelled.

use crate::core::dividend::SymbolRecord;
use crate::core::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum Horizon {
    SixMonths,
    OneYear,
    TwoYears,
    FiveYears,
}

impl Horizon {
    pub const ALL: [Horizon; 4] = [
        Horizon::SixMonths,
        Horizon::OneYear,
        Horizon::TwoYears,
        Horizon::FiveYears,
    ];

    pub fn years(&self) -> f64 {
        match self {
            Horizon::SixMonths => 0.5,
            Horizon::OneYear => 1.0,
            Horizon::TwoYears => 2.0,
            Horizon::FiveYears => 5.0,
        }
    }
}

impl Display for Horizon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Horizon::SixMonths => "6mo",
                Horizon::OneYear => "1y",
                Horizon::TwoYears => "2y",
                Horizon::FiveYears => "5y",
            }
        )
    }
}

impl FromStr for Horizon {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "6mo" => Ok(Horizon::SixMonths),
            "1y" => Ok(Horizon::OneYear),
            "2y" => Ok(Horizon::TwoYears),
            "5y" => Ok(Horizon::FiveYears),
            _ => Err(CoreError::InvalidInput(format!(
                "unknown horizon '{s}', expected one of 6mo, 1y, 2y, 5y"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectionResult {
    pub horizon: Horizon,
    pub projected_income: f64,
    /// Income as a fraction of principal.
    pub yield_on_principal: f64,
}

/// What the principal buys at the record's estimated price.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoldingEstimate {
    pub estimated_price: f64,
    pub shares: f64,
    pub dividend_per_payment: f64,
    pub payments_per_year: u32,
    /// Principal times yield, the same figure as the one-year projection.
    /// Can differ from `dividend_per_payment * payments_per_year` when the
    /// price was derived under the four-payments assumption.
    pub annual_income: f64,
}

fn validate(principal: f64, record: &SymbolRecord) -> Result<(), CoreError> {
    if !principal.is_finite() || principal <= 0.0 {
        return Err(CoreError::InvalidInput(format!(
            "principal must be a positive amount, got {principal}"
        )));
    }
    if !record.dividend_yield.is_finite() || record.dividend_yield < 0.0 {
        return Err(CoreError::InvalidInput(format!(
            "dividend yield of {} must be non-negative, got {}",
            record.symbol, record.dividend_yield
        )));
    }
    Ok(())
}

/// Projects dividend income on `principal` for each horizon, in the order
/// given.
pub fn project(
    principal: f64,
    record: &SymbolRecord,
    horizons: &[Horizon],
) -> Result<Vec<ProjectionResult>, CoreError> {
    validate(principal, record)?;

    let rate = record.dividend_yield / 100.0;
    Ok(horizons
        .iter()
        .map(|horizon| {
            let projected_income = principal * rate * horizon.years();
            ProjectionResult {
                horizon: *horizon,
                projected_income,
                yield_on_principal: projected_income / principal,
            }
        })
        .collect())
}

/// Estimates the share count and per-payment income the principal buys.
pub fn estimate_holding(
    principal: f64,
    record: &SymbolRecord,
) -> Result<HoldingEstimate, CoreError> {
    validate(principal, record)?;
    if !record.estimated_price.is_finite() || record.estimated_price <= 0.0 {
        return Err(CoreError::InvalidInput(format!(
            "estimated price of {} must be positive, got {}",
            record.symbol, record.estimated_price
        )));
    }

    let shares = principal / record.estimated_price;
    let dividend_per_payment = shares * record.last_dividend;
    let payments_per_year = record.frequency.payments_per_year();
    Ok(HoldingEstimate {
        estimated_price: record.estimated_price,
        shares,
        dividend_per_payment,
        payments_per_year,
        annual_income: principal * record.dividend_yield / 100.0,
    })
}
