//! Test oracles, stores, and corpus builders.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use iblt_calibrate::TrialOracle;
use iblt_calibrate_core::{Transaction, Trial, TrialOutcome, TxId};
use iblt_calibrate_store::MemoryTransactionStore;
use tempfile::TempDir;

/// Fails exactly when the cell count is below `threshold`.
#[derive(Debug, Clone, Copy)]
pub struct ThresholdOracle {
    pub threshold: u64,
}

impl ThresholdOracle {
    pub fn new(threshold: u64) -> Self {
        Self { threshold }
    }
}

impl TrialOracle for ThresholdOracle {
    fn run(&mut self, trial: &Trial) -> TrialOutcome {
        let size = trial.parameters.iblt_size();
        if trial.parameters.cell_count < self.threshold {
            TrialOutcome::failure(size)
        } else {
            TrialOutcome::success(size)
        }
    }
}

/// Pseudo-random failures, deterministic in salt, cell count, and sets.
///
/// Below `threshold` a trial fails with probability `below`, at or above it
/// with probability `above`. The draw is a hash of the trial, so replaying a
/// trial with the same salt gives the same outcome.
#[derive(Debug, Clone, Copy)]
pub struct HashedOracle {
    pub threshold: u64,
    pub below: f64,
    pub above: f64,
}

impl HashedOracle {
    pub fn new(threshold: u64, below: f64, above: f64) -> Self {
        Self {
            threshold,
            below,
            above,
        }
    }

    /// Uniform draw in `[0, 1)` for this trial.
    pub fn draw(trial: &Trial) -> f64 {
        let mut hasher = blake3::Hasher::new();
        if let Some(salt) = trial.parameters.salt {
            hasher.update(salt.as_bytes());
        }
        hasher.update(&trial.parameters.cell_count.to_be_bytes());
        for tx in &trial.sets.extra {
            hasher.update(tx.id.as_bytes());
        }
        hasher.update(b"|");
        for tx in &trial.sets.absent {
            hasher.update(tx.id.as_bytes());
        }
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&hasher.finalize().as_bytes()[..8]);
        (u64::from_be_bytes(bytes) >> 11) as f64 / (1u64 << 53) as f64
    }
}

impl TrialOracle for HashedOracle {
    fn run(&mut self, trial: &Trial) -> TrialOutcome {
        let rate = if trial.parameters.cell_count < self.threshold {
            self.below
        } else {
            self.above
        };
        let size = trial.parameters.iblt_size();
        if Self::draw(trial) < rate {
            TrialOutcome::failure(size)
        } else {
            TrialOutcome::success(size)
        }
    }
}

/// Counts calls to the wrapped oracle. Clone the counter before handing the
/// oracle to a controller.
#[derive(Debug, Clone)]
pub struct CountingOracle<O> {
    inner: O,
    calls: Arc<AtomicUsize>,
}

impl<O> CountingOracle<O> {
    pub fn new(inner: O) -> Self {
        Self {
            inner,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

impl<O: TrialOracle> TrialOracle for CountingOracle<O> {
    fn run(&mut self, trial: &Trial) -> TrialOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.run(trial)
    }
}

/// `n` distinct transactions with small deterministic payloads.
pub fn transactions(n: usize) -> Vec<Transaction> {
    (0..n as u64)
        .map(|i| Transaction::from_raw(format!("tx-{}", i).into_bytes()))
        .collect()
}

/// A memory store holding [`transactions(n)`](transactions).
pub fn populated_store(n: usize) -> Arc<MemoryTransactionStore> {
    Arc::new(MemoryTransactionStore::from_transactions(transactions(n)))
}

/// A store plus a scratch directory for trial files, corpora, and reports.
pub struct TestFixture {
    pub dir: TempDir,
    pub transactions: Vec<Transaction>,
    pub store: Arc<MemoryTransactionStore>,
}

impl TestFixture {
    /// Fixture with `n` stored transactions.
    pub fn new(n: usize) -> std::io::Result<Self> {
        let transactions = transactions(n);
        let store = Arc::new(MemoryTransactionStore::from_transactions(
            transactions.iter().cloned(),
        ));
        Ok(Self {
            dir: tempfile::tempdir()?,
            transactions,
            store,
        })
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn id(&self, index: usize) -> TxId {
        self.transactions[index].id
    }
}

/// Builds corpus-with-hints text.
#[derive(Debug, Default)]
pub struct CorpusBuilder {
    text: String,
}

impl CorpusBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// The transactions `node` put in its block at `height`.
    pub fn block(self, height: u64, node: &str, ids: &[TxId]) -> Self {
        self.record(height, node, "block", ids)
    }

    /// What `node` expected the block at `height` to contain.
    pub fn mempool(self, height: u64, node: &str, ids: &[TxId]) -> Self {
        self.record(height, node, "mempool", ids)
    }

    pub fn comment(mut self, text: &str) -> Self {
        let _ = writeln!(self.text, "# {}", text);
        self
    }

    fn record(mut self, height: u64, node: &str, kind: &str, ids: &[TxId]) -> Self {
        let ids: Vec<String> = ids.iter().map(TxId::to_hex).collect();
        let _ = writeln!(self.text, "{}:{}:{}:{}", height, node, kind, ids.join(","));
        self
    }

    pub fn build(self) -> String {
        self.text
    }

    pub fn write_to(self, path: impl AsRef<Path>) -> std::io::Result<()> {
        std::fs::write(path, self.text)
    }
}
