//! The calibration controller.
//!
//! Drives the search for the smallest cell count whose observed failure
//! probability is at or below the target:
//!
//! ```text
//!   Probe ──run_batch──▶ Decide ──inside bracket──▶ Probe (forked generator)
//!                          │
//!                          └──bracket closed / probe cap──▶ Done
//! ```
//!
//! Each probe runs one batch of trials through the oracle at a fixed cell
//! count. The decision moves one end of the [`SearchInterval`]; the next probe
//! is a fresh fork of the generator at the interval's next value.

use std::io;

use iblt_calibrate_core::{AggregateResultStats, SearchInterval, Salt, TrialOutcome};

use crate::config::CalibrationConfig;
use crate::error::{CalibrationError, Result};
use crate::generator::TrialGenerator;
use crate::oracle::{OracleBoundary, TrialOracle};
use crate::report::{CalibrationReport, ProbeResult, Reporter};

/// Search state.
enum Phase {
    Probe,
    Decide(AggregateResultStats),
    Done,
}

/// Runs calibration searches against one oracle.
pub struct CalibrationController<'c, O, R> {
    config: &'c CalibrationConfig,
    oracle: OracleBoundary<O>,
    reporter: R,
    interval: Option<SearchInterval>,
}

impl<'c, O: TrialOracle, R: Reporter> CalibrationController<'c, O, R> {
    /// Validates `config` and sets up the oracle boundary it asks for.
    pub fn new(config: &'c CalibrationConfig, oracle: O, reporter: R) -> Result<Self> {
        config.validate()?;
        let oracle = OracleBoundary::new(oracle, config.oracle_timeout())?;
        Ok(Self {
            config,
            oracle,
            reporter,
            interval: None,
        })
    }

    /// Start from a known bracket instead of growing from `config.floor`.
    pub fn with_interval(mut self, interval: SearchInterval) -> Self {
        self.interval = Some(interval);
        self
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    pub fn into_reporter(self) -> R {
        self.reporter
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Probe
    // ─────────────────────────────────────────────────────────────────────────

    /// Run one batch at the generator's cell count.
    ///
    /// Pulls trials until the generator is exhausted or the per-probe budget
    /// is spent. Returns a fresh tally; a batch without trials is an error.
    pub fn run_batch<G: TrialGenerator>(&mut self, generator: &mut G) -> Result<AggregateResultStats> {
        let budget = match self.config.max_trials_per_probe {
            Some(budget) => budget,
            None if generator.is_bounded() => usize::MAX,
            None => {
                return Err(CalibrationError::InvalidConfig(format!(
                    "{} never runs out; max_trials_per_probe must be set",
                    generator.describe()
                )))
            }
        };

        let parameters = *generator.parameters();
        advisory(self.reporter.probe_started(&parameters), "probe_started");

        let mut stats = AggregateResultStats::new();
        let mut trials = 0usize;
        while trials < budget {
            let trial = match generator.next_trial()? {
                Some(trial) => trial,
                None => break,
            };
            let outcome = self.oracle.run(trial)?;
            stats.add_sample(&outcome);
            trials += 1;

            if stats.sample_count() % self.config.progress_interval == 0 {
                advisory(self.reporter.progress(&parameters, &stats), "progress");
            }
        }

        if stats.is_empty() {
            return Err(CalibrationError::EmptyBatch {
                cell_count: parameters.cell_count,
            });
        }
        Ok(stats)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Search
    // ─────────────────────────────────────────────────────────────────────────

    /// Search for the smallest cell count meeting the target.
    ///
    /// The first probe runs at the generator's own cell count, unless that
    /// lies outside `(low, high]` of the starting bracket; then it runs at the
    /// bracket's next value. Ends with [`CalibrationError::NoCandidate`] if no
    /// probe met the target.
    pub fn calibrate<G: TrialGenerator>(&mut self, generator: G) -> Result<CalibrationReport> {
        let target = self.config.target_failure_probability;
        let input = generator.describe();
        let mut generator = generator;
        let mut interval = self
            .interval
            .unwrap_or_else(|| SearchInterval::unbounded(self.config.floor));

        let start = generator.cell_count();
        if start <= interval.low() || interval.high().map_or(false, |high| start > high) {
            let next = interval.next_value();
            tracing::warn!(
                start,
                low = interval.low(),
                high = ?interval.high(),
                next,
                "initial cell count outside the bracket; starting inside it"
            );
            generator = generator.fork(next)?;
        }
        let mut probes: Vec<ProbeResult> = Vec::new();
        let mut best: Option<ProbeResult> = None;
        let mut phase = Phase::Probe;

        tracing::info!(
            input = %input,
            target,
            start = generator.cell_count(),
            "calibration started"
        );

        loop {
            phase = match phase {
                Phase::Probe => {
                    if probes.len() >= self.config.max_probes {
                        tracing::warn!(
                            probes = probes.len(),
                            low = interval.low(),
                            high = ?interval.high(),
                            "probe cap reached before the bracket closed"
                        );
                        Phase::Done
                    } else {
                        Phase::Decide(self.run_batch(&mut generator)?)
                    }
                }
                Phase::Decide(stats) => {
                    let cell_count = generator.cell_count();
                    let observed = stats
                        .failure_probability()
                        .ok_or(CalibrationError::EmptyBatch { cell_count })?;
                    let result = ProbeResult {
                        parameters: *generator.parameters(),
                        stats,
                    };
                    tracing::info!(
                        cell_count,
                        samples = result.stats.sample_count(),
                        failure_probability = observed,
                        "probe finished"
                    );
                    advisory(self.reporter.probe_finished(&result), "probe_finished");

                    if observed <= target {
                        interval.set_high(cell_count);
                        best = Some(result.clone());
                    } else {
                        interval.set_low(cell_count);
                    }
                    probes.push(result);

                    let next = interval.next_value();
                    tracing::debug!(
                        low = interval.low(),
                        high = ?interval.high(),
                        next,
                        "interval updated"
                    );
                    if interval.is_inside_interval(next) {
                        generator = generator.fork(next)?;
                        Phase::Probe
                    } else {
                        Phase::Done
                    }
                }
                Phase::Done => break,
            };
        }

        let converged = interval.is_converged();
        let best = best.ok_or(CalibrationError::NoCandidate {
            target,
            probes: probes.len(),
        })?;
        let report = CalibrationReport {
            input,
            target_failure_probability: target,
            best,
            probes,
            converged,
        };
        tracing::info!(
            cell_count = report.cell_count(),
            iblt_size = report.best.iblt_size(),
            probes = report.probes.len(),
            converged,
            "calibration finished"
        );
        self.reporter.finish(&report)?;
        Ok(report)
    }

    /// Re-run trial `index` (0-based) of `generator` with an explicit salt.
    ///
    /// Used to reproduce a single reconciliation. Returns `Ok(None)` if the
    /// generator has fewer trials.
    pub fn replay_salted<G: TrialGenerator>(
        &mut self,
        generator: &mut G,
        index: usize,
        salt: u64,
    ) -> Result<Option<TrialOutcome>> {
        for _ in 0..index {
            if generator.next_trial()?.is_none() {
                return Ok(None);
            }
        }
        let mut trial = match generator.next_trial()? {
            Some(trial) => trial,
            None => return Ok(None),
        };
        trial.parameters.salt = Some(Salt::from_u64(salt));
        let outcome = self.oracle.run(trial)?;
        tracing::info!(
            index,
            salt,
            success = outcome.success,
            encoded_size = outcome.encoded_size,
            "replayed salted trial"
        );
        Ok(Some(outcome))
    }
}

fn advisory(result: io::Result<()>, hook: &'static str) {
    if let Err(e) = result {
        tracing::warn!(hook, error = %e, "reporter failed; continuing");
    }
}
