//! Error types for the calibration core.

use thiserror::Error;

/// Errors raised by core value constructors.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid transaction id {input:?}: {source}")]
    InvalidTxId {
        input: String,
        #[source]
        source: hex::FromHexError,
    },

    #[error("invalid search interval: low={low} must be below high={high}")]
    InvalidInterval { low: u64, high: u64 },
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
