//! # IBLT Calibrate Core
//!
//! Pure primitives for calibrating the size of an invertible Bloom lookup
//! table (IBLT) against a target reconciliation failure probability.
//!
//! This crate contains no I/O, no storage, no corpus parsing. It is pure
//! computation over trial descriptions and their outcomes.
//!
//! ## Key Types
//!
//! - [`TxId`] - Opaque 32-byte transaction content hash
//! - [`ReconciliationParameters`] - Encoding parameters plus set sizes for one trial
//! - [`Trial`] - Parameters together with the resolved extra/absent transactions
//! - [`AggregateResultStats`] - Running success/failure tally for one probe
//! - [`SearchInterval`] - Exponential-then-binary search bracket over the cell count

pub mod error;
pub mod interval;
pub mod params;
pub mod stats;
pub mod trial;
pub mod types;

pub use error::{CoreError, Result};
pub use interval::SearchInterval;
pub use params::{EncodingParams, ReconciliationParameters, Salt, COUNT_FIELD_SIZE};
pub use stats::AggregateResultStats;
pub use trial::{Transaction, TransactionSets, Trial, TrialOutcome};
pub use types::TxId;
