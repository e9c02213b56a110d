//! # IBLT Calibrate Store
//!
//! Transaction lookup for the calibration engine. Replay sources name
//! transactions by id; the store resolves those ids to full transactions.
//!
//! ## Key Types
//!
//! - [`TransactionStore`] - The lookup trait used by every trial generator
//! - [`SqliteTransactionStore`] - Persistent lookup backed by SQLite
//! - [`MemoryTransactionStore`] - In-memory lookup for tests and small corpora
//!
//! ## Usage
//!
//! ```rust,no_run
//! use iblt_calibrate_core::{Transaction, TxId};
//! use iblt_calibrate_store::{SqliteTransactionStore, TransactionStore};
//!
//! let store = SqliteTransactionStore::open("transactions.db").unwrap();
//! let tx = Transaction::from_raw(b"raw transaction bytes".to_vec());
//! store.insert(&tx).unwrap();
//! assert!(store.lookup(&tx.id).unwrap().is_some());
//! ```
//!
//! ## Design Notes
//!
//! - **Idempotent inserts**: Inserting the same id twice returns `AlreadyExists`
//! - **Stable enumeration**: `transaction_ids` is sorted, so seeded sampling
//!   over the pool is reproducible across store backends

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryTransactionStore;
pub use sqlite::SqliteTransactionStore;
pub use traits::{InsertResult, TransactionStore};
