//! # IBLT Calibrate
//!
//! Finds the smallest IBLT cell count whose reconciliation failure
//! probability stays at or below a target, by running batches of trials
//! through an external reconciliation oracle and searching over the cell
//! count.
//!
//! ## Key Types
//!
//! - [`CalibrationController`] - The probe/decide search loop
//! - [`TrialGenerator`] - Source of trials; synthetic, flat-file, or corpus replay
//! - [`TrialOracle`] - The reconciliation codec under test
//! - [`Reporter`] - Receives progress and the final [`CalibrationReport`]
//! - [`CalibrationConfig`] - Per-run settings
//! - [`Sweep`] - One calibration per value of a single setting
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use iblt_calibrate::{
//!     CalibrationConfig, CalibrationController, FileReporter, TrialFileGenerator,
//! };
//! use iblt_calibrate_core::{Trial, TrialOutcome};
//! use iblt_calibrate_store::SqliteTransactionStore;
//!
//! # fn main() -> iblt_calibrate::Result<()> {
//! let config = CalibrationConfig::from_json_file("calibration.json")?;
//! let store = Arc::new(SqliteTransactionStore::open("transactions.db")?);
//! let generator = TrialFileGenerator::open("trials.txt", store, config.initial_parameters())?;
//!
//! let oracle = |trial: &Trial| TrialOutcome::success(trial.parameters.iblt_size());
//! let reporter = FileReporter::create("results", "trials")?;
//! let mut controller = CalibrationController::new(&config, oracle, reporter)?;
//! let report = controller.calibrate(generator)?;
//! println!("cell count {}", report.cell_count());
//! # Ok(())
//! # }
//! ```
//!
//! ## Design Notes
//!
//! - **Sequential**: one trial is resolved before the next starts. With an
//!   oracle timeout configured the oracle runs on a worker thread, but calls
//!   are still one at a time.
//! - **Fresh forks**: every probe replays the workload from the start, so all
//!   probes are scored on the same trials.
//! - **Fatal data errors**: an id the store cannot resolve aborts the run.

pub mod config;
pub mod controller;
pub mod error;
pub mod generator;
pub mod oracle;
pub mod report;
pub mod sweep;

pub use config::CalibrationConfig;
pub use controller::CalibrationController;
pub use error::{CalibrationError, ErrorKind, Result};
pub use generator::{
    write_trials, write_trials_padded, AbsentPadding, CorpusGenerator, SyntheticGenerator,
    TrialFileGenerator, TrialFileReader, TrialFileWriter, TrialGenerator,
};
pub use oracle::{OracleBoundary, OracleWorker, TrialOracle};
pub use report::{CalibrationReport, FileReporter, MemoryReporter, ProbeResult, Reporter};
pub use sweep::{Sweep, SweepAxis, SweepRow, SweepStart, SweepTable};
