//! Error-rate tracking across ticks.
//!
//! A running workload is failed only after its error rate stays above the
//! limit for several consecutive successful samples. A single healthy sample
//! resets the count. Ticks without a usable sample (a failed or timed-out
//! sample, or a non-finite error rate) neither add a strike nor reset one.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use llmgrid_state::WorkloadId;

/// Consecutive high-error-rate samples per workload.
#[derive(Debug)]
pub struct ErrorRateTracker {
    strikes: HashMap<WorkloadId, u32>,
    /// Error rate above which a sample counts as a strike.
    limit: f64,
    /// Strikes needed before the workload is failed.
    threshold: u32,
}

impl ErrorRateTracker {
    pub fn new(limit: f64, threshold: u32) -> Self {
        Self {
            strikes: HashMap::new(),
            limit,
            threshold: threshold.max(1),
        }
    }

    /// Record a sample. Returns `true` once the threshold is reached.
    ///
    /// A NaN or infinite rate carries no signal and leaves the count as is.
    pub fn record(&mut self, id: &str, error_rate: f64) -> bool {
        if !error_rate.is_finite() {
            debug!(workload = %id, error_rate, "ignoring non-finite error rate");
            return false;
        }
        if error_rate <= self.limit {
            if self.strikes.remove(id).is_some() {
                debug!(workload = %id, error_rate, "error rate recovered");
            }
            return false;
        }

        let strikes = self.strikes.entry(id.to_string()).or_insert(0);
        *strikes += 1;
        if *strikes >= self.threshold {
            warn!(
                workload = %id,
                error_rate,
                strikes = *strikes,
                threshold = self.threshold,
                "error rate threshold reached"
            );
            true
        } else {
            debug!(workload = %id, error_rate, strikes = *strikes, "error rate above limit");
            false
        }
    }

    pub fn clear(&mut self, id: &str) {
        self.strikes.remove(id);
    }

    /// Drop counters for workloads that no longer exist.
    pub fn retain_live(&mut self, live: &HashSet<&str>) {
        self.strikes.retain(|id, _| live.contains(id.as_str()));
    }

    pub fn strikes(&self, id: &str) -> u32 {
        self.strikes.get(id).copied().unwrap_or(0)
    }

    pub fn tracked(&self) -> usize {
        self.strikes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trips_after_consecutive_breaches() {
        let mut tracker = ErrorRateTracker::new(0.5, 2);

        assert!(!tracker.record("a", 0.9));
        assert_eq!(tracker.strikes("a"), 1);
        assert!(tracker.record("a", 0.9));
    }

    #[test]
    fn healthy_sample_resets() {
        let mut tracker = ErrorRateTracker::new(0.5, 2);

        assert!(!tracker.record("a", 0.9));
        assert!(!tracker.record("a", 0.1));
        assert_eq!(tracker.strikes("a"), 0);
        assert!(!tracker.record("a", 0.9));
    }

    #[test]
    fn limit_is_exclusive() {
        let mut tracker = ErrorRateTracker::new(0.5, 1);
        assert!(!tracker.record("a", 0.5));
        assert!(tracker.record("a", 0.51));
    }

    #[test]
    fn non_finite_rates_are_neutral() {
        let mut tracker = ErrorRateTracker::new(0.5, 2);

        assert!(!tracker.record("a", f64::NAN));
        assert_eq!(tracker.tracked(), 0);

        assert!(!tracker.record("a", 0.9));
        assert!(!tracker.record("a", f64::INFINITY));
        assert_eq!(tracker.strikes("a"), 1);
        assert!(tracker.record("a", 0.9));
    }

    #[test]
    fn retain_live_prunes_deleted() {
        let mut tracker = ErrorRateTracker::new(0.5, 3);
        tracker.record("keep", 0.9);
        tracker.record("gone", 0.9);

        tracker.retain_live(&HashSet::from(["keep"]));

        assert_eq!(tracker.tracked(), 1);
        assert_eq!(tracker.strikes("keep"), 1);
        assert_eq!(tracker.strikes("gone"), 0);
    }
}
