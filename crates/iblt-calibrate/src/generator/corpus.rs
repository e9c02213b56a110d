//! Corpus replay: one trial per block transfer.

use std::collections::VecDeque;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use iblt_calibrate_core::{ReconciliationParameters, TransactionSets, Trial};
use iblt_calibrate_corpus::{BlockStream, BlockTransfer};
use iblt_calibrate_store::TransactionStore;

use super::{resolve, TrialCursor, TrialGenerator};
use crate::error::Result;

/// Turns each [`BlockTransfer`] of a corpus into a trial.
///
/// The source's block-only transactions become the extra set and the
/// receiver's mempool-only transactions the absent set. All transfers of a
/// height are used before the next height is read.
pub struct CorpusGenerator<S: ?Sized> {
    path: PathBuf,
    store: Arc<S>,
    stream: BlockStream<BufReader<File>>,
    pending: VecDeque<BlockTransfer>,
    parameters: ReconciliationParameters,
    cursor: TrialCursor,
}

impl<S: TransactionStore + ?Sized> CorpusGenerator<S> {
    pub fn open(
        path: impl AsRef<Path>,
        store: Arc<S>,
        parameters: ReconciliationParameters,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let stream = BlockStream::open(&path)?;
        Ok(Self {
            path,
            store,
            stream,
            pending: VecDeque::new(),
            parameters,
            cursor: TrialCursor::default(),
        })
    }

    /// Salt every trial with `Salt::derive(seed, trial_index)`.
    pub fn with_salt_seed(mut self, seed: u64) -> Self {
        self.cursor = TrialCursor::with_salt_seed(Some(seed));
        self
    }

    /// Height of the block currently being replayed.
    pub fn current_height(&self) -> Option<u64> {
        self.stream.last_height()
    }
}

impl<S: TransactionStore + ?Sized> TrialGenerator for CorpusGenerator<S> {
    fn parameters(&self) -> &ReconciliationParameters {
        &self.parameters
    }

    fn next_trial(&mut self) -> Result<Option<Trial>> {
        let transfer = loop {
            if let Some(transfer) = self.pending.pop_front() {
                break transfer;
            }
            match self.stream.next_block_transfers()? {
                Some(transfers) => self.pending.extend(transfers),
                None => return Ok(None),
            }
        };

        let origin = format!(
            "{} height {} ({} -> {})",
            self.path.display(),
            transfer.height,
            transfer.source,
            transfer.receiver
        );
        let sets = TransactionSets::new(
            resolve(self.store.as_ref(), &transfer.block_only, &origin)?,
            resolve(self.store.as_ref(), &transfer.mempool_only, &origin)?,
        );
        let parameters = self.cursor.advance(&self.parameters);
        Ok(Some(Trial::new(parameters, sets)))
    }

    fn fork_with(&self, parameters: ReconciliationParameters) -> Result<Self> {
        let mut fork = Self::open(&self.path, Arc::clone(&self.store), parameters)?;
        fork.cursor = self.cursor.restarted();
        Ok(fork)
    }

    fn describe(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}
