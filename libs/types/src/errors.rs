//! Error types for the margin engine
//!
//! Comprehensive error taxonomy using thiserror. Component-local
//! errors (single-position requirement, single-order submission) are
//! folded into the cycle-level event by the orchestrator; only
//! programmer errors (invalid instrument configuration) panic.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level risk-engine error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RiskError {
    #[error("Requirement error: {0}")]
    Requirement(#[from] RequirementError),

    #[error("Submission error: {0}")]
    Submission(#[from] SubmissionError),
}

/// Margin-requirement computation errors (per position, recoverable)
///
/// Serializable so the aggregator can surface them on the margin state
/// it reports.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RequirementError {
    #[error("No margin formula for instrument {symbol} of kind {kind}")]
    UnsupportedInstrumentKind { symbol: String, kind: String },

    #[error("Stale or missing market data for {symbol}")]
    StaleOrMissingMarketData { symbol: String },
}

/// Order-submission errors (per order; cycle continues)
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Submission rejected for {symbol}: {reason}")]
pub struct SubmissionError {
    pub symbol: String,
    pub reason: String,
}

impl SubmissionError {
    pub fn new(symbol: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_kind_display() {
        let err = RequirementError::UnsupportedInstrumentKind {
            symbol: "XYZ-SWAP".to_string(),
            kind: "OtherDerivative".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "No margin formula for instrument XYZ-SWAP of kind OtherDerivative"
        );
    }

    #[test]
    fn test_stale_data_display() {
        let err = RequirementError::StaleOrMissingMarketData {
            symbol: "GOOG".to_string(),
        };
        assert!(err.to_string().contains("GOOG"));
    }

    #[test]
    fn test_risk_error_from_requirement_error() {
        let req_err = RequirementError::StaleOrMissingMarketData {
            symbol: "GOOG".to_string(),
        };
        let risk_err: RiskError = req_err.into();
        assert!(matches!(risk_err, RiskError::Requirement(_)));
    }

    #[test]
    fn test_submission_error_display() {
        let err = SubmissionError::new("GOOG", "execution layer rejected");
        assert_eq!(
            err.to_string(),
            "Submission rejected for GOOG: execution layer rejected"
        );
    }
}
