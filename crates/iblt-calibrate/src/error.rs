//! Error types for calibration runs.

use std::time::Duration;

use iblt_calibrate_core::TxId;
use iblt_calibrate_corpus::CorpusError;
use iblt_calibrate_store::StoreError;
use thiserror::Error;

/// Errors that abort a calibration run.
#[derive(Debug, Error)]
pub enum CalibrationError {
    /// A replayed id is unknown to the transaction store.
    #[error("transaction {id} referenced by {origin} not found")]
    UnresolvedTransaction { id: TxId, origin: String },

    /// A replay source is malformed.
    #[error("data inconsistency in {origin} at line {line}: {detail}")]
    DataInconsistency {
        origin: String,
        line: usize,
        detail: String,
    },

    /// Reading a replay source or writing a report failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Transaction store failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Corpus replay failed.
    #[error("corpus error: {0}")]
    Corpus(#[from] CorpusError),

    /// A probe produced no trials, so no failure probability exists.
    #[error("probe at cell count {cell_count} produced no trials")]
    EmptyBatch { cell_count: u64 },

    /// The search ended without any probe meeting the target.
    #[error("no probe met target failure probability {target} in {probes} probes")]
    NoCandidate { target: f64, probes: usize },

    /// The synthetic pool is smaller than one trial.
    #[error("transaction pool has {available} entries, trial needs {needed}")]
    InsufficientPool { needed: usize, available: usize },

    /// The oracle did not answer in time.
    #[error("oracle did not return within {timeout:?}")]
    OracleTimeout { timeout: Duration },

    /// The oracle worker is gone (it panicked or was abandoned).
    #[error("oracle worker disconnected")]
    OracleDisconnected,

    /// Configuration rejected.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration could not be parsed.
    #[error("configuration parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

/// Coarse failure category, for operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    DataInconsistency,
    Io,
    Statistics,
    Search,
    Oracle,
    Config,
}

impl CalibrationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnresolvedTransaction { .. }
            | Self::DataInconsistency { .. }
            | Self::InsufficientPool { .. } => ErrorKind::DataInconsistency,
            Self::Corpus(CorpusError::Io(_)) => ErrorKind::Io,
            Self::Corpus(_) => ErrorKind::DataInconsistency,
            Self::Store(StoreError::InvalidData(_)) => ErrorKind::DataInconsistency,
            Self::Io(_) | Self::Store(_) => ErrorKind::Io,
            Self::EmptyBatch { .. } => ErrorKind::Statistics,
            Self::NoCandidate { .. } => ErrorKind::Search,
            Self::OracleTimeout { .. } | Self::OracleDisconnected => ErrorKind::Oracle,
            Self::InvalidConfig(_) | Self::ConfigParse(_) => ErrorKind::Config,
        }
    }

    pub fn is_data_inconsistency(&self) -> bool {
        self.kind() == ErrorKind::DataInconsistency
    }
}

/// Result type for calibration operations.
pub type Result<T> = std::result::Result<T, CalibrationError>;
