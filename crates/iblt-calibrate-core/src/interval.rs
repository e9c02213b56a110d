//! Search bracket over the cell count.
//!
//! The bracket `(low, high)` always satisfies: `low` was observed to miss the
//! target and `high` was observed to meet it. Without an upper bound yet, the
//! search grows geometrically from `low`; once bracketed it bisects.
//!
//! The decision signal is a sampled estimate, so observations may contradict
//! earlier ones. Contradictions widen the bracket again rather than leaving it
//! inverted; the caller is expected to cap the number of probes.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Exponential-then-binary search state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchInterval {
    /// Lowest value the search may fall back to.
    floor: u64,
    /// Largest value observed to miss the target.
    low: u64,
    /// Smallest value observed to meet the target.
    high: Option<u64>,
}

impl SearchInterval {
    /// A known bracket. Requires `low < high`.
    pub fn new(low: u64, high: u64) -> Result<Self> {
        if low >= high {
            return Err(CoreError::InvalidInterval { low, high });
        }
        Ok(Self {
            floor: low,
            low,
            high: Some(high),
        })
    }

    /// A bracket with no upper bound yet.
    pub fn unbounded(low: u64) -> Self {
        Self {
            floor: low,
            low,
            high: None,
        }
    }

    pub fn low(&self) -> u64 {
        self.low
    }

    pub fn high(&self) -> Option<u64> {
        self.high
    }

    /// Record that `value` missed the target.
    pub fn set_low(&mut self, value: u64) {
        if let Some(high) = self.high {
            if value >= high {
                tracing::warn!(
                    value,
                    high,
                    "value at or above the upper bound missed the target; dropping upper bound"
                );
                self.high = None;
            }
        }
        self.low = value;
    }

    /// Record that `value` met the target.
    pub fn set_high(&mut self, value: u64) {
        if value <= self.low {
            tracing::warn!(
                value,
                low = self.low,
                floor = self.floor,
                "value at or below the lower bound met the target; resetting lower bound"
            );
            self.low = self.floor.min(value.saturating_sub(1));
        }
        self.high = Some(value);
    }

    /// Next value to probe.
    ///
    /// Doubles from `low` until an upper bound exists, then returns the
    /// midpoint. Once `high - low <= 1` the midpoint equals `low`, which
    /// [`is_inside_interval`](Self::is_inside_interval) rejects.
    pub fn next_value(&self) -> u64 {
        match self.high {
            None => self.low.saturating_mul(2).max(self.low.saturating_add(1)),
            Some(high) => self.low + high.saturating_sub(self.low) / 2,
        }
    }

    /// Whether `value` lies strictly inside the open bracket.
    ///
    /// `false` is the terminal condition of the search.
    pub fn is_inside_interval(&self, value: u64) -> bool {
        value > self.low && self.high.map_or(true, |high| value < high)
    }

    /// Whether no value is left to probe between the bounds.
    pub fn is_converged(&self) -> bool {
        self.high
            .map_or(false, |high| high.saturating_sub(self.low) <= 1)
    }
}
