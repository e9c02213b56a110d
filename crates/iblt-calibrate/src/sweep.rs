//! Parameter sweeps: one calibration per value of a single setting.
//!
//! A sweep repeats [`CalibrationController::calibrate`] while varying one
//! thing (the value size, the target failure probability, or the input) and
//! collects each run's best probe into a [`SweepTable`].
//!
//! ## Key Types
//!
//! - [`Sweep`] - Runs the calibrations
//! - [`SweepAxis`] - The setting being varied
//! - [`SweepStart`] - Where each run after the first starts its search
//! - [`SweepTable`] - One row per value, writable as CSV

use std::io::{self, Write};

use serde::Serialize;

use iblt_calibrate_core::{EncodingParams, ReconciliationParameters};

use crate::config::CalibrationConfig;
use crate::controller::CalibrationController;
use crate::error::Result;
use crate::generator::TrialGenerator;
use crate::oracle::TrialOracle;
use crate::report::{CalibrationReport, Reporter};

/// The setting a sweep varies.
#[derive(Debug, Clone, PartialEq)]
pub enum SweepAxis {
    /// Value size in bytes. The generator is forked with each.
    ValueSize(Vec<u32>),
    /// Target failure probability.
    TargetFailureProbability(Vec<f64>),
}

impl SweepAxis {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ValueSize(_) => "value_size",
            Self::TargetFailureProbability(_) => "target_failure_probability",
        }
    }

    fn labels(&self) -> Vec<String> {
        match self {
            Self::ValueSize(values) => values.iter().map(u32::to_string).collect(),
            Self::TargetFailureProbability(values) => values.iter().map(f64::to_string).collect(),
        }
    }

    fn apply(&self, index: usize, config: &mut CalibrationConfig, encoding: &mut EncodingParams) {
        match self {
            Self::ValueSize(values) => {
                encoding.value_size = values[index];
                config.encoding.value_size = values[index];
            }
            Self::TargetFailureProbability(values) => {
                config.target_failure_probability = values[index];
            }
        }
    }
}

/// Starting cell count of each run after the first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SweepStart {
    /// The generator's own cell count.
    #[default]
    Initial,
    /// The previous run's best cell count times `factor`.
    Previous { factor: u64 },
}

/// Best probe of one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepRow {
    /// The swept value, as text.
    pub value: String,
    pub report: CalibrationReport,
}

/// Result of a sweep.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepTable {
    /// Name of the swept setting; the first CSV column.
    pub axis: String,
    pub rows: Vec<SweepRow>,
}

impl SweepTable {
    /// Best cell count of each row, in sweep order.
    pub fn cell_counts(&self) -> Vec<u64> {
        self.rows.iter().map(|row| row.report.cell_count()).collect()
    }

    pub fn write_csv<W: Write>(&self, mut out: W) -> io::Result<()> {
        writeln!(
            out,
            "{},cell_count,iblt_size,samples,failure_probability,converged",
            self.axis
        )?;
        for row in &self.rows {
            let best = &row.report.best;
            let probability = best
                .failure_probability()
                .map(|p| p.to_string())
                .unwrap_or_default();
            writeln!(
                out,
                "{},{},{},{},{},{}",
                row.value,
                best.cell_count(),
                best.iblt_size(),
                best.stats.sample_count(),
                probability,
                row.report.converged
            )?;
        }
        out.flush()
    }
}

/// Repeated calibrations over one axis.
///
/// Each run gets its own controller, so the oracle and reporter are built per
/// run by the closures passed to [`run`](Sweep::run) and
/// [`run_inputs`](Sweep::run_inputs). The reporter closure receives the swept
/// value.
pub struct Sweep<'c> {
    base: &'c CalibrationConfig,
    start: SweepStart,
}

impl<'c> Sweep<'c> {
    pub fn new(base: &'c CalibrationConfig) -> Self {
        Self {
            base,
            start: SweepStart::Initial,
        }
    }

    /// Start each run after the first at the previous best times `factor`.
    pub fn start_from_previous(mut self, factor: u64) -> Self {
        self.start = SweepStart::Previous { factor };
        self
    }

    /// Calibrate `generator` once per value of `axis`.
    pub fn run<G, O, R, F, P>(
        &self,
        axis: &SweepAxis,
        generator: &G,
        mut oracle: F,
        mut reporter: P,
    ) -> Result<SweepTable>
    where
        G: TrialGenerator,
        O: TrialOracle,
        R: Reporter,
        F: FnMut() -> O,
        P: FnMut(&str) -> io::Result<R>,
    {
        let template = *generator.parameters();
        let mut rows = Vec::new();
        let mut previous = None;

        for (index, value) in axis.labels().into_iter().enumerate() {
            let mut config = self.base.clone();
            let mut encoding = template.encoding();
            axis.apply(index, &mut config, &mut encoding);

            let mut parameters = ReconciliationParameters::new(
                encoding,
                self.start_for(previous, template.cell_count),
            )
            .with_counts(template.extra_count, template.absent_count);
            parameters.salt = template.salt;

            let forked = generator.fork_with(parameters)?;
            let report = calibrate_once(&config, forked, oracle(), reporter(&value)?)?;
            previous = Some(report.cell_count());
            tracing::info!(
                axis = axis.name(),
                value = %value,
                cell_count = report.cell_count(),
                "sweep point finished"
            );
            rows.push(SweepRow { value, report });
        }

        Ok(SweepTable {
            axis: axis.name().to_string(),
            rows,
        })
    }

    /// Calibrate each generator in turn, labelled by its input name.
    pub fn run_inputs<G, I, O, R, F, P>(
        &self,
        generators: I,
        mut oracle: F,
        mut reporter: P,
    ) -> Result<SweepTable>
    where
        G: TrialGenerator,
        I: IntoIterator<Item = G>,
        O: TrialOracle,
        R: Reporter,
        F: FnMut() -> O,
        P: FnMut(&str) -> io::Result<R>,
    {
        let mut rows = Vec::new();
        let mut previous = None;

        for generator in generators {
            let value = generator.describe();
            let start = self.start_for(previous, generator.cell_count());
            let generator = if start == generator.cell_count() {
                generator
            } else {
                generator.fork(start)?
            };

            let report = calibrate_once(self.base, generator, oracle(), reporter(&value)?)?;
            previous = Some(report.cell_count());
            tracing::info!(
                axis = "input",
                value = %value,
                cell_count = report.cell_count(),
                "sweep point finished"
            );
            rows.push(SweepRow { value, report });
        }

        Ok(SweepTable {
            axis: "input".to_string(),
            rows,
        })
    }

    fn start_for(&self, previous: Option<u64>, own: u64) -> u64 {
        match (self.start, previous) {
            (SweepStart::Previous { factor }, Some(best)) => best.saturating_mul(factor).max(1),
            _ => own,
        }
    }
}

fn calibrate_once<G, O, R>(
    config: &CalibrationConfig,
    generator: G,
    oracle: O,
    reporter: R,
) -> Result<CalibrationReport>
where
    G: TrialGenerator,
    O: TrialOracle,
    R: Reporter,
{
    let mut controller = CalibrationController::new(config, oracle, reporter)?;
    controller.calibrate(generator)
}
