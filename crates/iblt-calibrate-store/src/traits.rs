//! TransactionStore trait: the lookup collaborator of the trial generators.

use iblt_calibrate_core::{Transaction, TxId};

use crate::error::Result;

/// Result of inserting a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertResult {
    /// Transaction was inserted.
    Inserted,
    /// A transaction with this id already exists (idempotent - not an error).
    AlreadyExists,
}

/// Synchronous transaction lookup.
///
/// Calibration runs are strictly sequential, so the trait is blocking.
/// Implementations must still be shareable (`Send + Sync`) because generators
/// hold the store behind an `Arc` and forks share it.
pub trait TransactionStore: Send + Sync {
    /// Resolve an id. `Ok(None)` means the id is unknown.
    fn lookup(&self, id: &TxId) -> Result<Option<Transaction>>;

    /// Insert a transaction keyed by its id.
    fn insert(&self, transaction: &Transaction) -> Result<InsertResult>;

    /// All known ids, sorted ascending.
    fn transaction_ids(&self) -> Result<Vec<TxId>>;

    /// Number of stored transactions.
    fn len(&self) -> Result<usize>;

    /// Whether the store is empty.
    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Whether an id is known.
    fn contains(&self, id: &TxId) -> Result<bool> {
        Ok(self.lookup(id)?.is_some())
    }

    /// Insert many transactions; returns how many were new.
    fn insert_all<'a, I>(&self, transactions: I) -> Result<usize>
    where
        I: IntoIterator<Item = &'a Transaction>,
        Self: Sized,
    {
        let mut inserted = 0;
        for transaction in transactions {
            if self.insert(transaction)? == InsertResult::Inserted {
                inserted += 1;
            }
        }
        Ok(inserted)
    }
}
