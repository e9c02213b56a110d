//! Probe results, the final report, and the reporting collaborator.
//!
//! ## Key Types
//!
//! - [`ProbeResult`] - Parameters and aggregated outcomes of one probe
//! - [`CalibrationReport`] - Outcome of a whole run
//! - [`Reporter`] - Receives progress and results as the run proceeds
//! - [`FileReporter`] - Writes a per-probe CSV and a summary into a directory
//! - [`MemoryReporter`] - Keeps everything in memory, for tests

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use iblt_calibrate_core::{AggregateResultStats, ReconciliationParameters};

/// One probe: a batch of trials at a single cell count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeResult {
    pub parameters: ReconciliationParameters,
    pub stats: AggregateResultStats,
}

impl ProbeResult {
    pub fn cell_count(&self) -> u64 {
        self.parameters.cell_count
    }

    pub fn iblt_size(&self) -> u64 {
        self.parameters.iblt_size()
    }

    pub fn failure_probability(&self) -> Option<f64> {
        self.stats.failure_probability()
    }
}

/// Result of a calibration run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalibrationReport {
    /// Name of the trial source.
    pub input: String,
    pub target_failure_probability: f64,
    /// Most recent probe that met the target: the upper end of the final bracket.
    pub best: ProbeResult,
    /// Every probe, in the order run.
    pub probes: Vec<ProbeResult>,
    /// `false` when the probe cap ended the search early.
    pub converged: bool,
}

impl CalibrationReport {
    pub fn cell_count(&self) -> u64 {
        self.best.cell_count()
    }

    /// Trials run across all probes.
    pub fn total_samples(&self) -> u64 {
        self.probes.iter().map(|p| p.stats.sample_count()).sum()
    }
}

/// Receives progress and results during a run.
///
/// Failures of everything but [`finish`](Reporter::finish) are logged and
/// ignored by the controller.
pub trait Reporter {
    fn probe_started(&mut self, _parameters: &ReconciliationParameters) -> io::Result<()> {
        Ok(())
    }

    fn progress(
        &mut self,
        _parameters: &ReconciliationParameters,
        _stats: &AggregateResultStats,
    ) -> io::Result<()> {
        Ok(())
    }

    fn probe_finished(&mut self, _result: &ProbeResult) -> io::Result<()> {
        Ok(())
    }

    fn finish(&mut self, report: &CalibrationReport) -> io::Result<()>;
}

impl<R: Reporter + ?Sized> Reporter for &mut R {
    fn probe_started(&mut self, parameters: &ReconciliationParameters) -> io::Result<()> {
        (**self).probe_started(parameters)
    }

    fn progress(
        &mut self,
        parameters: &ReconciliationParameters,
        stats: &AggregateResultStats,
    ) -> io::Result<()> {
        (**self).progress(parameters, stats)
    }

    fn probe_finished(&mut self, result: &ProbeResult) -> io::Result<()> {
        (**self).probe_finished(result)
    }

    fn finish(&mut self, report: &CalibrationReport) -> io::Result<()> {
        (**self).finish(report)
    }
}

/// Collects every callback.
#[derive(Debug, Default)]
pub struct MemoryReporter {
    /// Cell count of each started probe.
    pub started: Vec<u64>,
    /// `(cell_count, samples so far)` per progress call.
    pub progress: Vec<(u64, u64)>,
    pub finished: Vec<ProbeResult>,
    pub report: Option<CalibrationReport>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Reporter for MemoryReporter {
    fn probe_started(&mut self, parameters: &ReconciliationParameters) -> io::Result<()> {
        self.started.push(parameters.cell_count);
        Ok(())
    }

    fn progress(
        &mut self,
        parameters: &ReconciliationParameters,
        stats: &AggregateResultStats,
    ) -> io::Result<()> {
        self.progress.push((parameters.cell_count, stats.sample_count()));
        Ok(())
    }

    fn probe_finished(&mut self, result: &ProbeResult) -> io::Result<()> {
        self.finished.push(result.clone());
        Ok(())
    }

    fn finish(&mut self, report: &CalibrationReport) -> io::Result<()> {
        self.report = Some(report.clone());
        Ok(())
    }
}

/// Writes results into a directory as timestamped files:
///
/// - `<prefix>-probes-<tag>.csv` - one row per finished probe
/// - `<prefix>-progress-<tag>.csv` - running tally, one row per progress call
/// - `<prefix>-<tag>.txt` - summary of the chosen parameters
/// - `<prefix>-<tag>.json` - the full report, when enabled
///
/// The tag is the creation time in milliseconds, with a `-<n>` suffix when
/// another reporter already claimed that time in the same directory.
pub struct FileReporter {
    dir: PathBuf,
    prefix: String,
    tag: String,
    probes: BufWriter<File>,
    progress: BufWriter<File>,
    write_json: bool,
}

impl FileReporter {
    pub fn create(dir: impl AsRef<Path>, prefix: impl Into<String>) -> io::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        let prefix = prefix.into();
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);

        let (tag, probes) = claim(&dir, &prefix, millis)?;
        let mut probes = BufWriter::new(probes);
        writeln!(probes, "cell_count,iblt_size,samples,failures,failure_probability")?;

        let progress = File::create(dir.join(format!("{}-progress-{}.csv", prefix, tag)))?;
        let mut progress = BufWriter::new(progress);
        writeln!(progress, "cell_count,samples,failures,failure_probability")?;

        Ok(Self {
            dir,
            prefix,
            tag,
            probes,
            progress,
            write_json: false,
        })
    }

    /// Also write the full report as JSON.
    pub fn with_json(mut self, enabled: bool) -> Self {
        self.write_json = enabled;
        self
    }

    pub fn probes_path(&self) -> PathBuf {
        self.dir
            .join(format!("{}-probes-{}.csv", self.prefix, self.tag))
    }

    pub fn progress_path(&self) -> PathBuf {
        self.dir
            .join(format!("{}-progress-{}.csv", self.prefix, self.tag))
    }

    pub fn summary_path(&self) -> PathBuf {
        self.dir.join(format!("{}-{}.txt", self.prefix, self.tag))
    }

    pub fn json_path(&self) -> PathBuf {
        self.dir.join(format!("{}-{}.json", self.prefix, self.tag))
    }

    fn write_report_json(&self, report: &CalibrationReport) -> io::Result<()> {
        let mut out = BufWriter::new(File::create(self.json_path())?);
        serde_json::to_writer_pretty(&mut out, report)?;
        out.flush()
    }

    fn write_summary(&self, report: &CalibrationReport) -> io::Result<()> {
        let mut out = BufWriter::new(File::create(self.summary_path())?);
        let p = &report.best.parameters;
        writeln!(out, "input: {}", report.input)?;
        writeln!(out, "samples: {}", report.total_samples())?;
        writeln!(out, "target failure probability: {}", report.target_failure_probability)?;
        match report.best.failure_probability() {
            Some(observed) => writeln!(out, "observed failure probability: {}", observed)?,
            None => writeln!(out, "observed failure probability: n/a")?,
        }
        writeln!(out, "iblt size: {}", p.iblt_size())?;
        writeln!(out, "cell count: {}", p.cell_count)?;
        writeln!(out, "hash functions: {}", p.hash_function_count)?;
        writeln!(out, "key size: {}", p.key_size)?;
        writeln!(out, "value size: {}", p.value_size)?;
        writeln!(out, "key hash size: {}", p.key_hash_size)?;
        writeln!(out, "extra count: {}", p.extra_count)?;
        writeln!(out, "absent count: {}", p.absent_count)?;
        writeln!(out, "probes: {}", report.probes.len())?;
        writeln!(out, "converged: {}", report.converged)?;
        out.flush()
    }
}

/// Create the probe CSV under the first free tag for `millis`.
fn claim(dir: &Path, prefix: &str, millis: u128) -> io::Result<(String, File)> {
    let mut suffix = 0u32;
    loop {
        let tag = match suffix {
            0 => millis.to_string(),
            n => format!("{}-{}", millis, n),
        };
        let path = dir.join(format!("{}-probes-{}.csv", prefix, tag));
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((tag, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => suffix += 1,
            Err(e) => return Err(e),
        }
    }
}

impl Reporter for FileReporter {
    fn progress(
        &mut self,
        parameters: &ReconciliationParameters,
        stats: &AggregateResultStats,
    ) -> io::Result<()> {
        let probability = stats
            .failure_probability()
            .map(|p| p.to_string())
            .unwrap_or_default();
        writeln!(
            self.progress,
            "{},{},{},{}",
            parameters.cell_count,
            stats.sample_count(),
            stats.failures(),
            probability
        )?;
        self.progress.flush()?;
        self.probes.flush()
    }

    fn probe_finished(&mut self, result: &ProbeResult) -> io::Result<()> {
        let probability = result
            .failure_probability()
            .map(|p| p.to_string())
            .unwrap_or_default();
        writeln!(
            self.probes,
            "{},{},{},{},{}",
            result.cell_count(),
            result.iblt_size(),
            result.stats.sample_count(),
            result.stats.failures(),
            probability
        )
    }

    fn finish(&mut self, report: &CalibrationReport) -> io::Result<()> {
        self.probes.flush()?;
        self.progress.flush()?;
        self.write_summary(report)?;
        if self.write_json {
            self.write_report_json(report)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iblt_calibrate_core::{EncodingParams, TrialOutcome};

    fn probe(cell_count: u64, successes: usize, failures: usize) -> ProbeResult {
        let mut stats = AggregateResultStats::new();
        for _ in 0..successes {
            stats.add_sample(&TrialOutcome::success(10));
        }
        for _ in 0..failures {
            stats.add_sample(&TrialOutcome::failure(10));
        }
        ProbeResult {
            parameters: ReconciliationParameters::new(EncodingParams::default(), cell_count),
            stats,
        }
    }

    fn report() -> CalibrationReport {
        let probes = vec![probe(150, 5, 5), probe(300, 10, 0)];
        CalibrationReport {
            input: "trials.txt".into(),
            target_failure_probability: 0.05,
            best: probes[1].clone(),
            probes,
            converged: true,
        }
    }

    #[test]
    fn test_report_totals() {
        let report = report();
        assert_eq!(report.cell_count(), 300);
        assert_eq!(report.total_samples(), 20);
        assert_eq!(report.probes[0].failure_probability(), Some(0.5));
    }

    fn drive<R: Reporter>(mut reporter: R) {
        let p = probe(40, 1, 0);
        reporter.probe_started(&p.parameters).unwrap();
        reporter.progress(&p.parameters, &p.stats).unwrap();
        reporter.probe_finished(&p).unwrap();
        reporter.finish(&report()).unwrap();
    }

    #[test]
    fn test_memory_reporter_through_reference() {
        let mut memory = MemoryReporter::new();
        drive(&mut memory);

        assert_eq!(memory.started, vec![40]);
        assert_eq!(memory.progress, vec![(40, 1)]);
        assert_eq!(memory.finished.len(), 1);
        assert_eq!(memory.report.unwrap().cell_count(), 300);
    }

    #[test]
    fn test_file_reporter_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let mut reporter = FileReporter::create(dir.path().join("results"), "run")
            .unwrap()
            .with_json(true);
        let report = report();
        for p in &report.probes {
            reporter.progress(&p.parameters, &p.stats).unwrap();
            reporter.probe_finished(p).unwrap();
        }
        reporter.finish(&report).unwrap();

        let progress = std::fs::read_to_string(reporter.progress_path()).unwrap();
        let rows: Vec<&str> = progress.lines().collect();
        assert_eq!(rows, vec![
            "cell_count,samples,failures,failure_probability",
            "150,10,5,0.5",
            "300,10,0,0",
        ]);

        let csv = std::fs::read_to_string(reporter.probes_path()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "cell_count,iblt_size,samples,failures,failure_probability");
        assert_eq!(lines[1], format!("150,{},10,5,0.5", 150 * 80));
        assert_eq!(lines[2], format!("300,{},10,0,0", 300 * 80));

        let summary = std::fs::read_to_string(reporter.summary_path()).unwrap();
        assert!(summary.contains("input: trials.txt"));
        assert!(summary.contains("cell count: 300"));
        assert!(summary.contains("samples: 20"));
        assert!(summary.contains("converged: true"));

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(reporter.json_path()).unwrap()).unwrap();
        assert_eq!(json["best"]["parameters"]["cell_count"], 300);
    }

    #[test]
    fn test_file_reporters_in_same_directory_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let first = FileReporter::create(dir.path(), "run").unwrap();
        let second = FileReporter::create(dir.path(), "run").unwrap();

        assert_ne!(first.probes_path(), second.probes_path());
        assert_ne!(first.summary_path(), second.summary_path());
        assert!(first.probes_path().exists());
        assert!(second.probes_path().exists());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_json_write_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut reporter = FileReporter::create(dir.path(), "run").unwrap().with_json(true);
        std::os::unix::fs::symlink("/dev/full", reporter.json_path()).unwrap();

        assert!(reporter.finish(&report()).is_err());
    }
}
