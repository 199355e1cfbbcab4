//! Error taxonomy for the calendar core

use thiserror::Error;

/// Failures the core reports to the presentation layer.
///
/// Transient upstream failures only surface here when no earlier snapshot
/// exists to fall back on. `InvalidInput` is always a caller error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    #[error("Dividend data unavailable: {0}")]
    DataUnavailable(String),

    #[error("Exchange rate {from}->{to} unavailable: {reason}")]
    RateUnavailable {
        from: String,
        to: String,
        reason: String,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl CoreError {
    pub fn rate_unavailable(from: &str, to: &str, reason: impl Into<String>) -> Self {
        CoreError::RateUnavailable {
            from: from.to_string(),
            to: to.to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::rate_unavailable("USD", "EUR", "connection refused");
        assert_eq!(
            err.to_string(),
            "Exchange rate USD->EUR unavailable: connection refused"
        );

        let err = CoreError::InvalidInput("principal must be positive, got -10".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid input: principal must be positive, got -10"
        );
    }
}
