//! In-memory implementation of the TransactionStore trait.
//!
//! Same semantics as SQLite, no persistence.

use std::collections::BTreeMap;
use std::sync::RwLock;

use iblt_calibrate_core::{Transaction, TxId};

use crate::error::{Result, StoreError};
use crate::traits::{InsertResult, TransactionStore};

/// In-memory store. Thread-safe via RwLock.
#[derive(Default)]
pub struct MemoryTransactionStore {
    inner: RwLock<BTreeMap<TxId, Transaction>>,
}

impl MemoryTransactionStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding the given transactions.
    pub fn from_transactions(transactions: impl IntoIterator<Item = Transaction>) -> Self {
        Self {
            inner: RwLock::new(transactions.into_iter().map(|tx| (tx.id, tx)).collect()),
        }
    }
}

impl TransactionStore for MemoryTransactionStore {
    fn lookup(&self, id: &TxId) -> Result<Option<Transaction>> {
        let inner = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(inner.get(id).cloned())
    }

    fn insert(&self, transaction: &Transaction) -> Result<InsertResult> {
        let mut inner = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        if inner.contains_key(&transaction.id) {
            return Ok(InsertResult::AlreadyExists);
        }
        inner.insert(transaction.id, transaction.clone());
        Ok(InsertResult::Inserted)
    }

    fn transaction_ids(&self) -> Result<Vec<TxId>> {
        let inner = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(inner.keys().copied().collect())
    }

    fn len(&self) -> Result<usize> {
        let inner = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(inner.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_lookup() {
        let store = MemoryTransactionStore::new();
        let tx = Transaction::from_raw(b"hello".to_vec());

        assert_eq!(store.insert(&tx).unwrap(), InsertResult::Inserted);
        assert_eq!(store.lookup(&tx.id).unwrap(), Some(tx.clone()));
        assert!(store.contains(&tx.id).unwrap());
    }

    #[test]
    fn test_insert_idempotent() {
        let store = MemoryTransactionStore::new();
        let tx = Transaction::from_raw(b"hello".to_vec());

        store.insert(&tx).unwrap();
        assert_eq!(store.insert(&tx).unwrap(), InsertResult::AlreadyExists);
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn test_unknown_id() {
        let store = MemoryTransactionStore::new();
        assert_eq!(store.lookup(&TxId::ZERO).unwrap(), None);
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_ids_sorted() {
        let txs: Vec<_> = (0u8..20)
            .map(|i| Transaction::from_raw(vec![i]))
            .collect();
        let store = MemoryTransactionStore::from_transactions(txs);

        let ids = store.transaction_ids().unwrap();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
        assert_eq!(ids.len(), 20);
    }
}
