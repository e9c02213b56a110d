//! Flat-file trial replay.
//!
//! A trial file is a sequence of line pairs:
//!
//! ```text
//! extra:<txid>,<txid>,...
//! absent:<txid>,...
//! ```
//!
//! Ids are 64 hex characters. Either list may be empty. Blank lines between
//! pairs are ignored.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;

use iblt_calibrate_core::{ReconciliationParameters, TransactionSets, Trial, TxId};
use iblt_calibrate_store::TransactionStore;

use super::{resolve, TrialCursor, TrialGenerator};
use crate::error::{CalibrationError, Result};

const EXTRA_PREFIX: &str = "extra:";
const ABSENT_PREFIX: &str = "absent:";

/// Reads id pairs from the flat-file format.
pub struct TrialFileReader<R> {
    reader: R,
    origin: String,
    line: usize,
}

impl<R: BufRead> TrialFileReader<R> {
    /// `origin` names the input in error messages.
    pub fn new(reader: R, origin: impl Into<String>) -> Self {
        Self {
            reader,
            origin: origin.into(),
            line: 0,
        }
    }

    /// Next `(extra, absent)` id pair, or `Ok(None)` at end of input.
    pub fn next_pair(&mut self) -> Result<Option<(Vec<TxId>, Vec<TxId>)>> {
        let extra = match self.next_line()? {
            Some(text) => self.parse_list(&text, EXTRA_PREFIX)?,
            None => return Ok(None),
        };
        let absent = match self.next_line()? {
            Some(text) => self.parse_list(&text, ABSENT_PREFIX)?,
            None => return Err(self.inconsistency("file ends after an extra line")),
        };
        Ok(Some((extra, absent)))
    }

    fn next_line(&mut self) -> Result<Option<String>> {
        let mut buf = String::new();
        loop {
            buf.clear();
            if self.reader.read_line(&mut buf)? == 0 {
                return Ok(None);
            }
            self.line += 1;
            let text = buf.trim();
            if !text.is_empty() {
                return Ok(Some(text.to_string()));
            }
        }
    }

    fn parse_list(&self, text: &str, prefix: &str) -> Result<Vec<TxId>> {
        let list = text
            .strip_prefix(prefix)
            .ok_or_else(|| self.inconsistency(format!("expected a line starting with {:?}", prefix)))?;
        list.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                TxId::from_hex(s)
                    .map_err(|e| self.inconsistency(format!("bad transaction id {:?}: {}", s, e)))
            })
            .collect()
    }

    fn inconsistency(&self, detail: impl Into<String>) -> CalibrationError {
        CalibrationError::DataInconsistency {
            origin: self.origin.clone(),
            line: self.line,
            detail: detail.into(),
        }
    }
}

/// Replays a trial file, resolving ids through a transaction store.
pub struct TrialFileGenerator<S: ?Sized> {
    path: PathBuf,
    store: Arc<S>,
    reader: TrialFileReader<BufReader<File>>,
    parameters: ReconciliationParameters,
    cursor: TrialCursor,
}

impl<S: TransactionStore + ?Sized> TrialFileGenerator<S> {
    pub fn open(
        path: impl AsRef<Path>,
        store: Arc<S>,
        parameters: ReconciliationParameters,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let reader = Self::open_reader(&path)?;
        Ok(Self {
            path,
            store,
            reader,
            parameters,
            cursor: TrialCursor::default(),
        })
    }

    /// Salt every trial with `Salt::derive(seed, trial_index)`.
    pub fn with_salt_seed(mut self, seed: u64) -> Self {
        self.cursor = TrialCursor::with_salt_seed(Some(seed));
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open_reader(path: &Path) -> Result<TrialFileReader<BufReader<File>>> {
        let file = File::open(path)?;
        Ok(TrialFileReader::new(
            BufReader::new(file),
            path.display().to_string(),
        ))
    }
}

impl<S: TransactionStore + ?Sized> TrialGenerator for TrialFileGenerator<S> {
    fn parameters(&self) -> &ReconciliationParameters {
        &self.parameters
    }

    fn next_trial(&mut self) -> Result<Option<Trial>> {
        let (extra, absent) = match self.reader.next_pair()? {
            Some(pair) => pair,
            None => return Ok(None),
        };
        let origin = &self.reader.origin;
        let sets = TransactionSets::new(
            resolve(self.store.as_ref(), &extra, origin)?,
            resolve(self.store.as_ref(), &absent, origin)?,
        );
        let parameters = self.cursor.advance(&self.parameters);
        Ok(Some(Trial::new(parameters, sets)))
    }

    fn fork_with(&self, parameters: ReconciliationParameters) -> Result<Self> {
        Ok(Self {
            path: self.path.clone(),
            store: Arc::clone(&self.store),
            reader: Self::open_reader(&self.path)?,
            parameters,
            cursor: self.cursor.restarted(),
        })
    }

    fn describe(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Writes trials in the flat-file format.
pub struct TrialFileWriter<W: Write> {
    out: W,
    written: usize,
}

impl TrialFileWriter<BufWriter<File>> {
    /// Create (or truncate) a trial file.
    pub fn create(path: impl AsRef<Path>) -> std::io::Result<Self> {
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write> TrialFileWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out, written: 0 }
    }

    /// Write one pair of id lists.
    pub fn write_ids(&mut self, extra: &[TxId], absent: &[TxId]) -> std::io::Result<()> {
        write_list(&mut self.out, EXTRA_PREFIX, extra)?;
        write_list(&mut self.out, ABSENT_PREFIX, absent)?;
        self.written += 1;
        Ok(())
    }

    /// Write the ids of a resolved pair of sets.
    pub fn write_sets(&mut self, sets: &TransactionSets) -> std::io::Result<()> {
        self.write_ids(&sets.extra_ids(), &sets.absent_ids())
    }

    /// Pairs written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    /// Flush and return the underlying writer.
    pub fn finish(mut self) -> std::io::Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }
}

fn write_list<W: Write>(out: &mut W, prefix: &str, ids: &[TxId]) -> std::io::Result<()> {
    out.write_all(prefix.as_bytes())?;
    for (i, id) in ids.iter().enumerate() {
        if i > 0 {
            out.write_all(b",")?;
        }
        out.write_all(id.to_hex().as_bytes())?;
    }
    out.write_all(b"\n")
}

/// Makes every recorded absent list as long as its extra list.
///
/// Absent lists are cut to the extra count, and short ones are topped up with
/// ids drawn from `pool` that appear in neither list. Draws come from a
/// `StdRng` seeded with `seed`.
pub struct AbsentPadding {
    pool: Arc<[TxId]>,
    rng: StdRng,
}

impl AbsentPadding {
    pub fn new(pool: impl Into<Arc<[TxId]>>, seed: u64) -> Self {
        Self {
            pool: pool.into(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Pad from every id the store holds.
    pub fn from_store<S: TransactionStore + ?Sized>(store: &S, seed: u64) -> Result<Self> {
        Ok(Self::new(store.transaction_ids()?, seed))
    }

    fn apply(&mut self, extra: &[TxId], absent: &mut Vec<TxId>) -> Result<()> {
        absent.truncate(extra.len());
        let needed = extra.len() - absent.len();
        if needed == 0 {
            return Ok(());
        }

        let taken: HashSet<&TxId> = extra.iter().chain(absent.iter()).collect();
        let candidates: Vec<TxId> = self
            .pool
            .iter()
            .filter(|id| !taken.contains(id))
            .copied()
            .collect();
        if candidates.len() < needed {
            return Err(CalibrationError::InsufficientPool {
                needed,
                available: candidates.len(),
            });
        }
        let drawn: Vec<TxId> = index::sample(&mut self.rng, candidates.len(), needed)
            .into_iter()
            .map(|i| candidates[i])
            .collect();
        absent.extend(drawn);
        Ok(())
    }
}

/// Record up to `count` trials from `generator` into a trial file.
///
/// Returns the number written, which is less than `count` only if the
/// generator ran out first.
pub fn write_trials<G: TrialGenerator>(
    generator: &mut G,
    count: usize,
    path: impl AsRef<Path>,
) -> Result<usize> {
    record(generator, count, path.as_ref(), None)
}

/// [`write_trials`], with each absent list padded to its extra list's length.
///
/// Turns corpus replay, where absent sets are usually smaller, into a trial
/// file with balanced differences.
pub fn write_trials_padded<G: TrialGenerator>(
    generator: &mut G,
    count: usize,
    path: impl AsRef<Path>,
    padding: &mut AbsentPadding,
) -> Result<usize> {
    record(generator, count, path.as_ref(), Some(padding))
}

fn record<G: TrialGenerator>(
    generator: &mut G,
    count: usize,
    path: &Path,
    mut padding: Option<&mut AbsentPadding>,
) -> Result<usize> {
    let mut writer = TrialFileWriter::create(path)?;
    while writer.written() < count {
        let trial = match generator.next_trial()? {
            Some(trial) => trial,
            None => break,
        };
        let extra = trial.sets.extra_ids();
        let mut absent = trial.sets.absent_ids();
        if let Some(padding) = padding.as_deref_mut() {
            padding.apply(&extra, &mut absent)?;
        }
        writer.write_ids(&extra, &absent)?;
    }
    let written = writer.written();
    writer.finish()?;
    tracing::info!(
        path = %path.display(),
        written,
        padded = padding.is_some(),
        source = %generator.describe(),
        "wrote trial file"
    );
    Ok(written)
}
