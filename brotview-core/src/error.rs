use thiserror::Error;

/// Errors originating from the core geometry, color and session layer.
#[derive(Debug, Error, PartialEq)]
pub enum CoreError {
    #[error("invalid iteration budget: {0} (must be >= 1)")]
    InvalidIterationBudget(u32),

    #[error("invalid divergence limit: {0} (must be finite and > 0)")]
    InvalidDivergenceLimit(f64),

    #[error("invalid block size: {0} (must be >= 1)")]
    InvalidBlockSize(u32),

    #[error("invalid rectangle: {reason}")]
    InvalidRect { reason: String },

    #[error("invalid color map: {reason}")]
    InvalidColorMap { reason: String },

    #[error("unknown color map: {0:?}")]
    UnknownColorMap(String),
}
