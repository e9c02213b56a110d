//! Aggregation of trial outcomes into a failure-probability estimate.

use serde::{Deserialize, Serialize};

use crate::trial::TrialOutcome;

/// Running tally over one batch of trials at fixed parameters.
///
/// Counters only grow. A new batch starts from a new instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateResultStats {
    successes: u64,
    failures: u64,
    total_encoded_size: u64,
}

impl AggregateResultStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one outcome.
    pub fn add_sample(&mut self, outcome: &TrialOutcome) {
        if outcome.success {
            self.successes += 1;
        } else {
            self.failures += 1;
        }
        self.total_encoded_size = self.total_encoded_size.saturating_add(outcome.encoded_size);
    }

    pub fn successes(&self) -> u64 {
        self.successes
    }

    pub fn failures(&self) -> u64 {
        self.failures
    }

    pub fn sample_count(&self) -> u64 {
        self.successes + self.failures
    }

    pub fn is_empty(&self) -> bool {
        self.sample_count() == 0
    }

    /// `failures / (successes + failures)`, or `None` with no samples.
    pub fn failure_probability(&self) -> Option<f64> {
        match self.sample_count() {
            0 => None,
            total => Some(self.failures as f64 / total as f64),
        }
    }

    /// Mean encoded size over all samples.
    pub fn average_encoded_size(&self) -> Option<f64> {
        match self.sample_count() {
            0 => None,
            total => Some(self.total_encoded_size as f64 / total as f64),
        }
    }
}

impl<'a> Extend<&'a TrialOutcome> for AggregateResultStats {
    fn extend<I: IntoIterator<Item = &'a TrialOutcome>>(&mut self, iter: I) {
        for outcome in iter {
            self.add_sample(outcome);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty_has_no_probability() {
        let stats = AggregateResultStats::new();
        assert!(stats.is_empty());
        assert_eq!(stats.failure_probability(), None);
        assert_eq!(stats.average_encoded_size(), None);
    }

    #[test]
    fn test_counts_and_probability() {
        let mut stats = AggregateResultStats::new();
        stats.add_sample(&TrialOutcome::success(100));
        stats.add_sample(&TrialOutcome::success(100));
        stats.add_sample(&TrialOutcome::success(100));
        stats.add_sample(&TrialOutcome::failure(300));

        assert_eq!(stats.successes(), 3);
        assert_eq!(stats.failures(), 1);
        assert_eq!(stats.failure_probability(), Some(0.25));
        assert_eq!(stats.average_encoded_size(), Some(150.0));
    }

    proptest! {
        #[test]
        fn test_probability_matches_ratio(outcomes in prop::collection::vec(any::<bool>(), 1..500)) {
            let mut stats = AggregateResultStats::new();
            stats.extend(
                outcomes
                    .iter()
                    .map(|ok| TrialOutcome { success: *ok, encoded_size: 0 })
                    .collect::<Vec<_>>()
                    .iter(),
            );

            let failures = outcomes.iter().filter(|ok| !**ok).count() as u64;
            let total = outcomes.len() as u64;

            prop_assert_eq!(stats.failures(), failures);
            prop_assert_eq!(stats.sample_count(), total);
            prop_assert_eq!(stats.failure_probability(), Some(failures as f64 / total as f64));
        }
    }
}
