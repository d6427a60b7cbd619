//! Lifecycle monitor — background task that refreshes metrics and advances
//! workload phases.
//!
//! Each tick snapshots the registry, samples every workload concurrently
//! outside the registry lock, then applies metrics and phase rules with one
//! `update_with` per record:
//!
//! - `Pending` is left alone.
//! - `Scheduled` becomes `Running` once it has stayed scheduled for longer
//!   than the startup grace.
//! - `Running` becomes `Failed` after the error rate exceeds the limit on
//!   consecutive ticks.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use llmgrid_core::{MAX_PERIOD, OrchestratorConfig};
use llmgrid_metrics::{MetricsError, MetricsSource, sample_with_timeout};
use llmgrid_state::*;

use crate::tracker::ErrorRateTracker;

/// Status message set on workloads failed for their error rate.
pub const ERROR_RATE_MESSAGE: &str = "error rate exceeded threshold";

/// Tunables for the monitor.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorSettings {
    pub interval: Duration,
    pub startup_grace: Duration,
    pub sample_timeout: Duration,
    /// Only write metrics for `Scheduled`/`Running` workloads.
    pub freeze_terminal_metrics: bool,
    pub error_rate_limit: f64,
    pub error_rate_strikes: u32,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            startup_grace: Duration::from_secs(10),
            sample_timeout: Duration::from_secs(2),
            freeze_terminal_metrics: false,
            error_rate_limit: 0.5,
            error_rate_strikes: 2,
        }
    }
}

impl MonitorSettings {
    pub fn from_config(config: &OrchestratorConfig) -> Self {
        Self {
            interval: config.metrics_interval,
            startup_grace: config.startup_grace,
            sample_timeout: config.sample_timeout,
            freeze_terminal_metrics: config.freeze_terminal_metrics,
            ..Self::default()
        }
    }
}

/// What a single tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub sampled: usize,
    pub sample_errors: usize,
    pub transitions: usize,
}

pub struct LifecycleMonitor {
    registry: Registry,
    source: Arc<dyn MetricsSource>,
    settings: MonitorSettings,
    tracker: ErrorRateTracker,
}

impl LifecycleMonitor {
    pub fn new(registry: Registry, source: Arc<dyn MetricsSource>, settings: MonitorSettings) -> Self {
        let tracker = ErrorRateTracker::new(settings.error_rate_limit, settings.error_rate_strikes);
        Self {
            registry,
            source,
            settings,
            tracker,
        }
    }

    pub fn settings(&self) -> &MonitorSettings {
        &self.settings
    }

    pub fn tracker(&self) -> &ErrorRateTracker {
        &self.tracker
    }

    /// Run one tick against the current wall clock.
    pub async fn tick(&mut self) -> TickReport {
        self.tick_at(Utc::now()).await
    }

    /// Run one tick, judging the startup grace against `now`.
    pub async fn tick_at(&mut self, now: DateTime<Utc>) -> TickReport {
        let snapshot = self.registry.list();
        let live: HashSet<&str> = snapshot.iter().map(|w| w.id.as_str()).collect();
        self.tracker.retain_live(&live);

        let mut report = TickReport::default();
        let mut samples = self.sample_all(&snapshot).await;

        for w in &snapshot {
            let sample = match samples.remove(&w.id) {
                Some(Ok(m)) => {
                    report.sampled += 1;
                    Some(m)
                }
                Some(Err(e)) => {
                    report.sample_errors += 1;
                    warn!(workload = %w.id, error = %e, "metrics sample failed");
                    None
                }
                None => None,
            };

            match self.apply(&w.id, sample, now) {
                Ok(Some((from, to))) => {
                    report.transitions += 1;
                    info!(workload = %w.id, %from, %to, "workload phase advanced");
                }
                Ok(None) => {}
                Err(RegistryError::NotFound(_)) => {
                    // Deleted since the snapshot.
                    self.tracker.clear(&w.id);
                }
                Err(e) => warn!(workload = %w.id, error = %e, "lifecycle update rejected"),
            }
        }

        debug!(
            workloads = snapshot.len(),
            sampled = report.sampled,
            sample_errors = report.sample_errors,
            transitions = report.transitions,
            "lifecycle tick complete"
        );
        report
    }

    /// Run the monitor until `shutdown` flips to `true` or its sender drops.
    ///
    /// The tick period is clamped to [`MAX_PERIOD`].
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let period = self.settings.interval.clamp(Duration::from_millis(1), MAX_PERIOD);
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(interval = ?period, "lifecycle monitor started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("lifecycle monitor stopped");
    }

    /// Sample each workload that should receive metrics, concurrently.
    async fn sample_all(
        &self,
        snapshot: &[Workload],
    ) -> HashMap<WorkloadId, Result<WorkloadMetrics, MetricsError>> {
        let mut set = JoinSet::new();
        for w in snapshot {
            if self.settings.freeze_terminal_metrics && !w.phase().is_placed() {
                continue;
            }
            let source = self.source.clone();
            let timeout = self.settings.sample_timeout;
            let w = w.clone();
            set.spawn(async move {
                let result = sample_with_timeout(source.as_ref(), &w, timeout).await;
                (w.id, result)
            });
        }

        let mut samples = HashMap::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((id, result)) => {
                    samples.insert(id, result);
                }
                Err(e) => warn!(error = %e, "metrics sample task failed"),
            }
        }
        samples
    }

    /// Apply a sample and the phase rules to one record.
    fn apply(
        &mut self,
        id: &str,
        sample: Option<WorkloadMetrics>,
        now: DateTime<Utc>,
    ) -> RegistryResult<Option<(Phase, Phase)>> {
        let grace = chrono::Duration::from_std(self.settings.startup_grace)
            .unwrap_or(chrono::Duration::MAX);
        let freeze = self.settings.freeze_terminal_metrics;
        let tracker = &mut self.tracker;

        self.registry.update_with(id, |w| {
            let from = w.status.phase;

            if let Some(m) = &sample {
                if !freeze || from.is_placed() {
                    w.metrics = m.clone();
                }
            }

            match from {
                Phase::Scheduled => {
                    if now.signed_duration_since(w.status.last_updated) > grace {
                        w.status.phase = Phase::Running;
                        w.status.ready_replicas = w.status.replicas;
                    }
                }
                Phase::Running => {
                    if let Some(m) = &sample {
                        if tracker.record(id, m.error_rate) {
                            tracker.clear(id);
                            w.status.phase = Phase::Failed;
                            w.status.message = ERROR_RATE_MESSAGE.to_string();
                            w.status.ready_replicas = 0;
                            w.assigned_node.clear();
                        }
                    }
                }
                _ => tracker.clear(id),
            }

            let to = w.status.phase;
            Ok((from != to).then_some((from, to)))
        })
    }
}
