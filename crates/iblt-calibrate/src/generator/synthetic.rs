//! Synthetic workloads drawn from a transaction pool.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;

use iblt_calibrate_core::{ReconciliationParameters, TransactionSets, Trial, TxId};
use iblt_calibrate_store::TransactionStore;

use super::{resolve, TrialCursor, TrialGenerator};
use crate::error::{CalibrationError, Result};

/// Draws `extra_count + absent_count` distinct transactions per trial.
///
/// The pool is the store's id list, loaded once and shared by forks. Draws come
/// from a `StdRng` seeded with `seed`; a fork starts the sequence over, so each
/// probe is scored on the same workloads.
pub struct SyntheticGenerator<S: ?Sized> {
    store: Arc<S>,
    pool: Arc<[TxId]>,
    parameters: ReconciliationParameters,
    seed: u64,
    rng: StdRng,
    cursor: TrialCursor,
}

impl<S: TransactionStore + ?Sized> SyntheticGenerator<S> {
    /// `parameters` carries the per-trial set sizes.
    pub fn new(store: Arc<S>, parameters: ReconciliationParameters, seed: u64) -> Result<Self> {
        let pool: Arc<[TxId]> = store.transaction_ids()?.into();
        check_pool(&pool, &parameters)?;
        tracing::debug!(pool = pool.len(), seed, "synthetic pool loaded");
        Ok(Self {
            store,
            pool,
            parameters,
            seed,
            rng: StdRng::seed_from_u64(seed),
            cursor: TrialCursor::default(),
        })
    }

    /// Salt every trial with `Salt::derive(seed, trial_index)`.
    pub fn with_salt_seed(mut self, seed: u64) -> Self {
        self.cursor = TrialCursor::with_salt_seed(Some(seed));
        self
    }
}

fn check_pool(pool: &[TxId], parameters: &ReconciliationParameters) -> Result<()> {
    let needed = parameters.extra_count + parameters.absent_count;
    if pool.len() < needed {
        return Err(CalibrationError::InsufficientPool {
            needed,
            available: pool.len(),
        });
    }
    Ok(())
}

impl<S: TransactionStore + ?Sized> TrialGenerator for SyntheticGenerator<S> {
    fn parameters(&self) -> &ReconciliationParameters {
        &self.parameters
    }

    fn next_trial(&mut self) -> Result<Option<Trial>> {
        let extra_count = self.parameters.extra_count;
        let needed = extra_count + self.parameters.absent_count;

        let ids: Vec<TxId> = index::sample(&mut self.rng, self.pool.len(), needed)
            .into_iter()
            .map(|i| self.pool[i])
            .collect();
        let (extra, absent) = ids.split_at(extra_count);

        let sets = TransactionSets::new(
            resolve(self.store.as_ref(), extra, "synthetic pool")?,
            resolve(self.store.as_ref(), absent, "synthetic pool")?,
        );
        let parameters = self.cursor.advance(&self.parameters);
        Ok(Some(Trial::new(parameters, sets)))
    }

    fn fork_with(&self, parameters: ReconciliationParameters) -> Result<Self> {
        check_pool(&self.pool, &parameters)?;
        Ok(Self {
            store: Arc::clone(&self.store),
            pool: Arc::clone(&self.pool),
            parameters,
            seed: self.seed,
            rng: StdRng::seed_from_u64(self.seed),
            cursor: self.cursor.restarted(),
        })
    }

    fn describe(&self) -> String {
        format!(
            "synthetic-{}x{}",
            self.parameters.extra_count, self.parameters.absent_count
        )
    }

    fn is_bounded(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iblt_calibrate_core::{EncodingParams, Salt, Transaction};
    use iblt_calibrate_store::MemoryTransactionStore;
    use std::collections::BTreeSet;

    fn store(n: u32) -> Arc<MemoryTransactionStore> {
        Arc::new(MemoryTransactionStore::from_transactions(
            (0..n).map(|i| Transaction::from_raw(i.to_be_bytes().to_vec())),
        ))
    }

    fn params(extra: usize, absent: usize) -> ReconciliationParameters {
        ReconciliationParameters::new(EncodingParams::default(), 100).with_counts(extra, absent)
    }

    #[test]
    fn test_draws_distinct_transactions() {
        let mut generator = SyntheticGenerator::new(store(50), params(10, 5), 1).unwrap();
        for _ in 0..20 {
            let trial = generator.next_trial().unwrap().unwrap();
            assert_eq!(trial.sets.extra.len(), 10);
            assert_eq!(trial.sets.absent.len(), 5);
            assert_eq!(trial.parameters.extra_count, 10);
            assert_eq!(trial.parameters.absent_count, 5);

            let ids: BTreeSet<TxId> = trial
                .sets
                .extra_ids()
                .into_iter()
                .chain(trial.sets.absent_ids())
                .collect();
            assert_eq!(ids.len(), 15);
        }
    }

    #[test]
    fn test_fork_replays_same_workloads() {
        let mut generator = SyntheticGenerator::new(store(100), params(4, 4), 99).unwrap();
        let first: Vec<_> = (0..5)
            .map(|_| generator.next_trial().unwrap().unwrap().sets)
            .collect();

        let mut fork = generator.fork(250).unwrap();
        for sets in &first {
            let trial = fork.next_trial().unwrap().unwrap();
            assert_eq!(trial.parameters.cell_count, 250);
            assert_eq!(&trial.sets, sets);
        }
    }

    #[test]
    fn test_different_seeds_differ() {
        let mut a = SyntheticGenerator::new(store(100), params(8, 0), 1).unwrap();
        let mut b = SyntheticGenerator::new(store(100), params(8, 0), 2).unwrap();
        assert_ne!(
            a.next_trial().unwrap().unwrap().sets,
            b.next_trial().unwrap().unwrap().sets
        );
    }

    #[test]
    fn test_insufficient_pool() {
        let err = SyntheticGenerator::new(store(3), params(2, 2), 0).err().unwrap();
        assert!(matches!(
            err,
            CalibrationError::InsufficientPool {
                needed: 4,
                available: 3
            }
        ));
    }

    #[test]
    fn test_salted_trials() {
        let mut generator = SyntheticGenerator::new(store(10), params(1, 1), 0)
            .unwrap()
            .with_salt_seed(5);
        generator.next_trial().unwrap();
        let second = generator.next_trial().unwrap().unwrap();
        assert_eq!(second.parameters.salt, Some(Salt::derive(5, 1)));

        let mut fork = generator.fork(1).unwrap();
        let first = fork.next_trial().unwrap().unwrap();
        assert_eq!(first.parameters.salt, Some(Salt::derive(5, 0)));
    }

    #[test]
    fn test_fork_with_rechecks_pool() {
        let generator = SyntheticGenerator::new(store(6), params(2, 2), 0).unwrap();
        let mut wider = generator.fork_with(params(3, 3).with_cell_count(7)).unwrap();
        let trial = wider.next_trial().unwrap().unwrap();
        assert_eq!(trial.sets.difference_size(), 6);
        assert_eq!(trial.parameters.cell_count, 7);

        let err = generator.fork_with(params(4, 3)).err().unwrap();
        assert!(matches!(
            err,
            CalibrationError::InsufficientPool {
                needed: 7,
                available: 6
            }
        ));
    }

    #[test]
    fn test_never_exhausted() {
        let generator = SyntheticGenerator::new(store(2), params(1, 1), 0).unwrap();
        assert!(!generator.is_bounded());
        assert_eq!(generator.describe(), "synthetic-1x1");
    }
}
