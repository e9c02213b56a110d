//! Trial generators: the sources of workloads for a probe.
//!
//! Every variant produces a sequence of [`Trial`]s at one cell count, and can
//! be forked into a fresh generator at another cell count that replays the
//! workload from the start. The controller only sees the trait.
//!
//! ## Key Types
//!
//! - [`TrialGenerator`] - The source abstraction
//! - [`SyntheticGenerator`] - Random draws from a transaction pool; never exhausted
//! - [`TrialFileGenerator`] - Replay of `extra:`/`absent:` line pairs
//! - [`CorpusGenerator`] - Replay of a corpus-with-hints block stream
//! - [`TrialFileWriter`] - Writes the flat-file format
//! - [`AbsentPadding`] - Balances absent against extra when recording trials

mod corpus;
mod synthetic;
mod trial_file;

pub use corpus::CorpusGenerator;
pub use synthetic::SyntheticGenerator;
pub use trial_file::{
    write_trials, write_trials_padded, AbsentPadding, TrialFileGenerator, TrialFileReader,
    TrialFileWriter,
};

use iblt_calibrate_core::{ReconciliationParameters, Salt, Transaction, Trial, TxId};
use iblt_calibrate_store::TransactionStore;

use crate::error::{CalibrationError, Result};

/// A source of trials at a fixed cell count.
pub trait TrialGenerator {
    /// Parameter template for this generator. Set sizes are per trial.
    fn parameters(&self) -> &ReconciliationParameters;

    /// Cell count every produced trial carries.
    fn cell_count(&self) -> u64 {
        self.parameters().cell_count
    }

    /// Next trial, or `Ok(None)` once the source is exhausted.
    fn next_trial(&mut self) -> Result<Option<Trial>>;

    /// A fresh generator with a new parameter template, replaying the same
    /// workload from the beginning. Shares no read position with `self`.
    fn fork_with(&self, parameters: ReconciliationParameters) -> Result<Self>
    where
        Self: Sized;

    /// [`fork_with`](Self::fork_with) at another cell count.
    fn fork(&self, cell_count: u64) -> Result<Self>
    where
        Self: Sized,
    {
        self.fork_with(self.parameters().with_cell_count(cell_count))
    }

    /// Short name of the input, used in reports.
    fn describe(&self) -> String;

    /// Whether the source ends on its own.
    fn is_bounded(&self) -> bool {
        true
    }
}

/// Per-trial salt bookkeeping shared by every variant.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct TrialCursor {
    salt_seed: Option<u64>,
    index: u64,
}

impl TrialCursor {
    pub(crate) fn with_salt_seed(seed: Option<u64>) -> Self {
        Self {
            salt_seed: seed,
            index: 0,
        }
    }

    /// Same seed, index back at zero.
    pub(crate) fn restarted(&self) -> Self {
        Self::with_salt_seed(self.salt_seed)
    }

    /// Parameters for the next trial, salted when a seed is set.
    pub(crate) fn advance(&mut self, template: &ReconciliationParameters) -> ReconciliationParameters {
        let index = self.index;
        self.index += 1;
        match self.salt_seed {
            Some(seed) => template.with_salt(Salt::derive(seed, index)),
            None => *template,
        }
    }
}

/// Resolve ids through the store; an unknown id is a data inconsistency.
pub(crate) fn resolve<S>(store: &S, ids: &[TxId], origin: &str) -> Result<Vec<Transaction>>
where
    S: TransactionStore + ?Sized,
{
    ids.iter()
        .map(|id| {
            store
                .lookup(id)?
                .ok_or_else(|| CalibrationError::UnresolvedTransaction {
                    id: *id,
                    origin: origin.to_string(),
                })
        })
        .collect()
}
