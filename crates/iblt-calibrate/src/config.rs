//! Run configuration.
//!
//! One `CalibrationConfig` is built per run and passed by reference to the
//! controller and the generator constructors.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use iblt_calibrate_core::{EncodingParams, ReconciliationParameters};

use crate::error::{CalibrationError, Result};

/// Configuration for a calibration run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Largest acceptable failure probability; ties count as meeting it.
    pub target_failure_probability: f64,
    /// Cell count of the first probe.
    pub initial_cell_count: u64,
    /// Lower end of the search; assumed to miss the target.
    pub floor: u64,
    /// Cap on probes, guarding against a non-monotone oracle.
    pub max_probes: usize,
    /// Trials per probe; `None` runs each probe until the generator is exhausted.
    pub max_trials_per_probe: Option<usize>,
    /// Report progress every this many trials.
    pub progress_interval: u64,
    /// Abort the run if one oracle call takes longer. `None` calls inline.
    pub oracle_timeout_ms: Option<u64>,
    /// Fixed encoding parameters.
    pub encoding: EncodingParams,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            target_failure_probability: 0.05,
            initial_cell_count: 300,
            floor: 0,
            max_probes: 64,
            max_trials_per_probe: Some(1000),
            progress_interval: 100,
            oracle_timeout_ms: None,
            encoding: EncodingParams::default(),
        }
    }
}

impl CalibrationConfig {
    /// Parse from JSON; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Parameters of the first probe.
    pub fn initial_parameters(&self) -> ReconciliationParameters {
        ReconciliationParameters::new(self.encoding, self.initial_cell_count)
    }

    pub fn oracle_timeout(&self) -> Option<Duration> {
        self.oracle_timeout_ms.map(Duration::from_millis)
    }

    /// Reject configurations the controller cannot run.
    pub fn validate(&self) -> Result<()> {
        let target = self.target_failure_probability;
        if !(target > 0.0 && target < 1.0) {
            return Err(CalibrationError::InvalidConfig(format!(
                "target_failure_probability must be in (0, 1), got {}",
                target
            )));
        }
        if self.max_probes == 0 {
            return Err(CalibrationError::InvalidConfig(
                "max_probes must be positive".into(),
            ));
        }
        if self.progress_interval == 0 {
            return Err(CalibrationError::InvalidConfig(
                "progress_interval must be positive".into(),
            ));
        }
        if self.max_trials_per_probe == Some(0) {
            return Err(CalibrationError::InvalidConfig(
                "max_trials_per_probe must be positive when set".into(),
            ));
        }
        if self.oracle_timeout_ms == Some(0) {
            return Err(CalibrationError::InvalidConfig(
                "oracle_timeout_ms must be positive when set".into(),
            ));
        }
        Ok(())
    }
}
