//! Error types for corpus replay.

use thiserror::Error;

/// Errors that can occur while reading a corpus.
#[derive(Debug, Error)]
pub enum CorpusError {
    /// Underlying read failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A line does not follow the record format.
    #[error("malformed corpus record at line {line}: {reason}")]
    Malformed { line: usize, reason: String },

    /// A transaction id is not 64 hex characters.
    #[error("invalid transaction id at line {line}: {source}")]
    InvalidTxId {
        line: usize,
        #[source]
        source: iblt_calibrate_core::CoreError,
    },

    /// Heights went backwards or a finished height reappeared.
    #[error("corpus out of order at line {line}: height {found} after {previous}")]
    OutOfOrder {
        line: usize,
        previous: u64,
        found: u64,
    },
}

/// Result type for corpus operations.
pub type Result<T> = std::result::Result<T, CorpusError>;
