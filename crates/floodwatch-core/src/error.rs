use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoreError {
    #[error("invalid view mode: {0:?} (expected \"live\" or \"historical\")")]
    InvalidViewMode(String),

    #[error("malformed prediction: {0}")]
    MalformedPrediction(String),

    #[error("invalid risk thresholds: {0}")]
    InvalidThresholds(String),

    #[error("invalid ward record {id}: {reason}")]
    InvalidRecord { id: String, reason: String },

    #[error("unknown risk level: {0:?}")]
    UnknownRiskLevel(String),
}
