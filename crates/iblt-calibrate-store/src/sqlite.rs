//! SQLite implementation of the TransactionStore trait.
//!
//! The persistent lookup for large corpora. Uses rusqlite with bundled
//! SQLite; the connection sits behind a mutex so the store can be shared
//! between a generator and its forks.

use std::path::Path;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use rusqlite::{params, Connection, OptionalExtension};

use iblt_calibrate_core::{Transaction, TxId};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{InsertResult, TransactionStore};

/// SQLite-based transaction store.
#[derive(Clone)]
pub struct SqliteTransactionStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteTransactionStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        f(&conn)
    }
}

fn tx_id_from_blob(bytes: Vec<u8>) -> Result<TxId> {
    let arr: [u8; 32] = bytes
        .try_into()
        .map_err(|b: Vec<u8>| StoreError::InvalidData(format!("tx_id has {} bytes", b.len())))?;
    Ok(TxId::from_bytes(arr))
}

impl TransactionStore for SqliteTransactionStore {
    fn lookup(&self, id: &TxId) -> Result<Option<Transaction>> {
        self.with_conn(|conn| {
            let raw: Option<Vec<u8>> = conn
                .query_row(
                    "SELECT raw FROM transactions WHERE tx_id = ?1",
                    params![id.as_bytes().as_slice()],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(raw.map(|raw| Transaction::new(*id, Bytes::from(raw))))
        })
    }

    fn insert(&self, transaction: &Transaction) -> Result<InsertResult> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "INSERT OR IGNORE INTO transactions (tx_id, raw, inserted_at) VALUES (?1, ?2, ?3)",
                params![
                    transaction.id.as_bytes().as_slice(),
                    &transaction.raw[..],
                    migration::now_millis()
                ],
            )?;
            Ok(if changed == 0 {
                InsertResult::AlreadyExists
            } else {
                InsertResult::Inserted
            })
        })
    }

    fn transaction_ids(&self) -> Result<Vec<TxId>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT tx_id FROM transactions ORDER BY tx_id")?;
            let blobs = stmt
                .query_map([], |row| row.get::<_, Vec<u8>>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            blobs.into_iter().map(tx_id_from_blob).collect()
        })
    }

    fn len(&self) -> Result<usize> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM transactions", [], |row| {
                row.get(0)
            })?;
            Ok(count as usize)
        })
    }
}
