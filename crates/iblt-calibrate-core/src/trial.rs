//! Trials and their outcomes.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::params::ReconciliationParameters;
use crate::types::TxId;

/// A resolved transaction: its id and raw serialized bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub id: TxId,
    pub raw: Bytes,
}

impl Transaction {
    /// Create a transaction with an explicit id.
    pub fn new(id: TxId, raw: impl Into<Bytes>) -> Self {
        Self { id, raw: raw.into() }
    }

    /// Create a transaction whose id is the hash of its bytes.
    pub fn from_raw(raw: impl Into<Bytes>) -> Self {
        let raw = raw.into();
        Self {
            id: TxId::hash(&raw),
            raw,
        }
    }
}

/// The set difference a reconciliation must recover.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionSets {
    /// Present only on the sending side.
    pub extra: Vec<Transaction>,
    /// Present only on the receiving side.
    pub absent: Vec<Transaction>,
}

impl TransactionSets {
    pub fn new(extra: Vec<Transaction>, absent: Vec<Transaction>) -> Self {
        Self { extra, absent }
    }

    pub fn extra_ids(&self) -> Vec<TxId> {
        self.extra.iter().map(|tx| tx.id).collect()
    }

    pub fn absent_ids(&self) -> Vec<TxId> {
        self.absent.iter().map(|tx| tx.id).collect()
    }

    /// Total number of differing transactions.
    pub fn difference_size(&self) -> usize {
        self.extra.len() + self.absent.len()
    }
}

/// One reconciliation scenario handed to the oracle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trial {
    pub parameters: ReconciliationParameters,
    pub sets: TransactionSets,
}

impl Trial {
    /// Bind sets to parameters, overwriting the parameter set sizes with the
    /// actual sizes.
    pub fn new(parameters: ReconciliationParameters, sets: TransactionSets) -> Self {
        let parameters = parameters.with_counts(sets.extra.len(), sets.absent.len());
        Self { parameters, sets }
    }
}

/// Result of a single oracle invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialOutcome {
    /// Whether the full set difference was recovered.
    pub success: bool,
    /// Encoded size actually used, in bytes.
    pub encoded_size: u64,
}

impl TrialOutcome {
    pub fn success(encoded_size: u64) -> Self {
        Self {
            success: true,
            encoded_size,
        }
    }

    pub fn failure(encoded_size: u64) -> Self {
        Self {
            success: false,
            encoded_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::EncodingParams;

    #[test]
    fn test_trial_counts_follow_sets() {
        let sets = TransactionSets::new(
            vec![Transaction::from_raw(&b"a"[..]), Transaction::from_raw(&b"b"[..])],
            vec![Transaction::from_raw(&b"c"[..])],
        );
        let params = ReconciliationParameters::new(EncodingParams::default(), 50).with_counts(9, 9);
        let trial = Trial::new(params, sets);

        assert_eq!(trial.parameters.extra_count, 2);
        assert_eq!(trial.parameters.absent_count, 1);
        assert_eq!(trial.sets.difference_size(), 3);
    }

    #[test]
    fn test_from_raw_hashes_content() {
        let tx = Transaction::from_raw(vec![1u8, 2, 3]);
        assert_eq!(tx.id, TxId::hash(&[1, 2, 3]));
    }
}
