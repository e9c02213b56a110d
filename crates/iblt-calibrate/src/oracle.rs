//! The trial oracle and the boundary the controller calls it through.
//!
//! The oracle is the reconciliation codec under test: it encodes the extra
//! set, decodes against the absent set and reports whether the difference was
//! recovered. It is opaque to the engine.
//!
//! ## Key Types
//!
//! - [`TrialOracle`] - One blocking call per trial
//! - [`OracleBoundary`] - Inline call, or a worker thread with a deadline

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use iblt_calibrate_core::{Trial, TrialOutcome};

use crate::error::{CalibrationError, Result};

/// Runs one reconciliation trial.
///
/// Given the same salt and the same sets, an implementation must return the
/// same outcome.
pub trait TrialOracle: Send + 'static {
    fn run(&mut self, trial: &Trial) -> TrialOutcome;
}

impl<F> TrialOracle for F
where
    F: FnMut(&Trial) -> TrialOutcome + Send + 'static,
{
    fn run(&mut self, trial: &Trial) -> TrialOutcome {
        self(trial)
    }
}

/// How the controller reaches the oracle.
pub enum OracleBoundary<O> {
    /// Called on the controller's thread; a hung oracle hangs the run.
    Inline(O),
    /// Called on a dedicated thread, abandoned if it misses the deadline.
    Worker(OracleWorker),
}

impl<O: TrialOracle> OracleBoundary<O> {
    /// Inline when `timeout` is `None`, otherwise a worker thread.
    pub fn new(oracle: O, timeout: Option<Duration>) -> Result<Self> {
        match timeout {
            None => Ok(Self::Inline(oracle)),
            Some(timeout) => Ok(Self::Worker(OracleWorker::spawn(oracle, timeout)?)),
        }
    }

    /// Run one trial.
    pub fn run(&mut self, trial: Trial) -> Result<TrialOutcome> {
        match self {
            Self::Inline(oracle) => Ok(oracle.run(&trial)),
            Self::Worker(worker) => worker.run(trial),
        }
    }
}

/// Oracle running on its own thread, fed one trial at a time.
pub struct OracleWorker {
    requests: Option<Sender<Trial>>,
    outcomes: Receiver<TrialOutcome>,
    timeout: Duration,
    handle: Option<JoinHandle<()>>,
    stalled: bool,
}

impl OracleWorker {
    fn spawn<O: TrialOracle>(mut oracle: O, timeout: Duration) -> Result<Self> {
        let (request_tx, request_rx) = mpsc::channel::<Trial>();
        let (outcome_tx, outcome_rx) = mpsc::channel();

        let handle = thread::Builder::new()
            .name("iblt-oracle".into())
            .spawn(move || {
                for trial in request_rx {
                    if outcome_tx.send(oracle.run(&trial)).is_err() {
                        break;
                    }
                }
            })?;

        Ok(Self {
            requests: Some(request_tx),
            outcomes: outcome_rx,
            timeout,
            handle: Some(handle),
            stalled: false,
        })
    }

    /// A stalled worker accepts no work.
    fn run(&mut self, trial: Trial) -> Result<TrialOutcome> {
        if self.stalled {
            return Err(CalibrationError::OracleTimeout {
                timeout: self.timeout,
            });
        }
        let requests = self
            .requests
            .as_ref()
            .ok_or(CalibrationError::OracleDisconnected)?;
        requests
            .send(trial)
            .map_err(|_| CalibrationError::OracleDisconnected)?;

        match self.outcomes.recv_timeout(self.timeout) {
            Ok(outcome) => Ok(outcome),
            Err(RecvTimeoutError::Timeout) => {
                tracing::warn!(
                    timeout_ms = self.timeout.as_millis() as u64,
                    "oracle missed its deadline; abandoning worker"
                );
                self.stalled = true;
                Err(CalibrationError::OracleTimeout {
                    timeout: self.timeout,
                })
            }
            Err(RecvTimeoutError::Disconnected) => Err(CalibrationError::OracleDisconnected),
        }
    }
}

impl Drop for OracleWorker {
    fn drop(&mut self) {
        // Closing the request channel ends the worker loop.
        self.requests.take();
        if let Some(handle) = self.handle.take() {
            if self.stalled {
                // Still inside the oracle; detach.
                drop(handle);
            } else if handle.join().is_err() {
                tracing::warn!("oracle worker panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iblt_calibrate_core::{EncodingParams, ReconciliationParameters, TransactionSets};
    use std::time::Instant;

    fn trial(cell_count: u64) -> Trial {
        Trial::new(
            ReconciliationParameters::new(EncodingParams::default(), cell_count),
            TransactionSets::default(),
        )
    }

    fn threshold(t: &Trial) -> TrialOutcome {
        let size = t.parameters.iblt_size();
        if t.parameters.cell_count >= 10 {
            TrialOutcome::success(size)
        } else {
            TrialOutcome::failure(size)
        }
    }

    #[test]
    fn test_inline_calls_oracle() {
        let mut boundary = OracleBoundary::new(threshold, None).unwrap();
        assert!(matches!(boundary, OracleBoundary::Inline(_)));
        assert!(boundary.run(trial(10)).unwrap().success);
        assert!(!boundary.run(trial(9)).unwrap().success);
    }

    #[test]
    fn test_worker_preserves_order() {
        let mut boundary = OracleBoundary::new(threshold, Some(Duration::from_secs(5))).unwrap();
        assert!(matches!(boundary, OracleBoundary::Worker(_)));
        for cells in [1, 20, 3, 40] {
            assert_eq!(boundary.run(trial(cells)).unwrap().success, cells >= 10);
        }
    }

    #[test]
    fn test_stateful_closure() {
        let mut calls = 0u64;
        let oracle = move |_: &Trial| {
            calls += 1;
            TrialOutcome::success(calls)
        };
        let mut boundary = OracleBoundary::new(oracle, Some(Duration::from_secs(5))).unwrap();
        assert_eq!(boundary.run(trial(1)).unwrap().encoded_size, 1);
        assert_eq!(boundary.run(trial(1)).unwrap().encoded_size, 2);
    }

    #[test]
    fn test_timeout_abandons_worker() {
        let slow = |_: &Trial| {
            thread::sleep(Duration::from_millis(500));
            TrialOutcome::success(0)
        };
        let mut boundary = OracleBoundary::new(slow, Some(Duration::from_millis(20))).unwrap();

        let started = Instant::now();
        let err = boundary.run(trial(1)).unwrap_err();
        assert!(matches!(err, CalibrationError::OracleTimeout { .. }));
        assert!(started.elapsed() < Duration::from_millis(400));
        assert!(matches!(&boundary, OracleBoundary::Worker(worker) if worker.stalled));

        // No further work once stalled; dropping does not wait for the oracle.
        assert!(boundary.run(trial(1)).is_err());
        let started = Instant::now();
        drop(boundary);
        assert!(started.elapsed() < Duration::from_millis(400));
    }

    #[test]
    fn test_panicking_oracle_disconnects() {
        let broken = |_: &Trial| -> TrialOutcome { panic!("codec bug") };
        let mut boundary = OracleBoundary::new(broken, Some(Duration::from_secs(5))).unwrap();
        let err = boundary.run(trial(1)).unwrap_err();
        assert!(matches!(err, CalibrationError::OracleDisconnected));
    }
}
