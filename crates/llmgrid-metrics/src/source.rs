//! Metrics sources — where per-workload runtime metrics come from.
//!
//! The orchestrator does not measure anything itself. A [`MetricsSource`]
//! is asked for a fresh sample of each workload; the default
//! [`SyntheticSource`] derives plausible values from the wall clock.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use thiserror::Error;

use llmgrid_state::{Workload, WorkloadMetrics};

/// Errors a metrics source can report.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MetricsError {
    #[error("metrics unavailable for {id}: {reason}")]
    Unavailable { id: String, reason: String },

    #[error("metrics sample for {id} timed out after {timeout:?}")]
    Timeout { id: String, timeout: Duration },
}

pub type MetricsResult<T> = Result<T, MetricsError>;

/// Provides runtime metrics for a workload.
#[async_trait]
pub trait MetricsSource: Send + Sync {
    async fn sample(&self, workload: &Workload) -> MetricsResult<WorkloadMetrics>;
}

/// Sample `workload`, giving up after `timeout`.
pub async fn sample_with_timeout(
    source: &dyn MetricsSource,
    workload: &Workload,
    timeout: Duration,
) -> MetricsResult<WorkloadMetrics> {
    match tokio::time::timeout(timeout, source.sample(workload)).await {
        Ok(result) => result,
        Err(_) => Err(MetricsError::Timeout {
            id: workload.id.clone(),
            timeout,
        }),
    }
}

// ── Synthetic ──────────────────────────────────────────────────────

/// Deterministic clock-derived metrics.
///
/// Values cycle with the unix second so consecutive samples differ a
/// little. The error rate is a constant 1%.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyntheticSource;

impl SyntheticSource {
    pub fn sample_at(&self, workload: &Workload, now: DateTime<Utc>) -> WorkloadMetrics {
        let secs = now.timestamp();
        let cycle = |n: i64| secs.rem_euclid(n) as f64;

        WorkloadMetrics {
            rps: 100.0 + cycle(50),
            avg_latency: Duration::from_millis(50 + secs.rem_euclid(100) as u64),
            error_rate: 0.01,
            cpu_usage: 0.5 + cycle(30) / 100.0,
            memory_usage: 0.6 + cycle(20) / 100.0,
            gpu_usage: if workload.resources.gpu_count > 0 {
                0.8 + cycle(15) / 100.0
            } else {
                0.0
            },
            last_updated: Some(now),
        }
    }
}

#[async_trait]
impl MetricsSource for SyntheticSource {
    async fn sample(&self, workload: &Workload) -> MetricsResult<WorkloadMetrics> {
        Ok(self.sample_at(workload, Utc::now()))
    }
}

// ── Fixed ──────────────────────────────────────────────────────────

/// Returns the same metrics for every workload until changed.
///
/// With no metrics set, every sample fails with `Unavailable`.
#[derive(Debug, Default)]
pub struct FixedSource {
    metrics: Mutex<Option<WorkloadMetrics>>,
}

impl FixedSource {
    pub fn new(metrics: WorkloadMetrics) -> Self {
        Self {
            metrics: Mutex::new(Some(metrics)),
        }
    }

    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn set(&self, metrics: WorkloadMetrics) {
        *self.metrics.lock() = Some(metrics);
    }

    pub fn set_unavailable(&self) {
        *self.metrics.lock() = None;
    }
}

#[async_trait]
impl MetricsSource for FixedSource {
    async fn sample(&self, workload: &Workload) -> MetricsResult<WorkloadMetrics> {
        let metrics = self.metrics.lock().clone();
        match metrics {
            Some(mut m) => {
                m.last_updated = Some(Utc::now());
                Ok(m)
            }
            None => Err(MetricsError::Unavailable {
                id: workload.id.clone(),
                reason: "no metrics configured".into(),
            }),
        }
    }
}
