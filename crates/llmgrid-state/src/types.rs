//! Domain types for the workload registry.
//!
//! A [`Workload`] is a declarative request to serve a model together with
//! its runtime status and most recent metrics. All types serialize to JSON
//! for the control API.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use llmgrid_core::ResourceSpec;

/// Unique identifier for a workload.
pub type WorkloadId = String;

/// Unique identifier for a node in the cluster.
pub type NodeId = String;

// ── Phase ──────────────────────────────────────────────────────────

/// Coarse lifecycle state of a workload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Pending,
    Scheduled,
    Running,
    Failed,
    Completed,
}

impl Phase {
    pub const ALL: [Phase; 5] = [
        Phase::Pending,
        Phase::Scheduled,
        Phase::Running,
        Phase::Failed,
        Phase::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Pending => "pending",
            Phase::Scheduled => "scheduled",
            Phase::Running => "running",
            Phase::Failed => "failed",
            Phase::Completed => "completed",
        }
    }

    /// Phases in which a workload holds a node assignment.
    pub fn is_placed(&self) -> bool {
        matches!(self, Phase::Scheduled | Phase::Running)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Failed | Phase::Completed)
    }

    /// Whether the state machine permits moving from `self` to `next`.
    pub fn can_transition_to(&self, next: Phase) -> bool {
        use Phase::*;
        *self == next
            || matches!(
                (self, next),
                (Pending, Scheduled)
                    | (Pending, Failed)
                    | (Scheduled, Running)
                    | (Scheduled, Failed)
                    | (Running, Failed)
                    | (Running, Completed)
            )
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Status ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkloadStatus {
    pub phase: Phase,
    /// Human-readable reason for the current phase (e.g. a rejection).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    pub replicas: u32,
    pub ready_replicas: u32,
    pub last_updated: DateTime<Utc>,
}

// ── Metrics ────────────────────────────────────────────────────────

/// Most recent runtime metrics sampled for a workload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkloadMetrics {
    /// Requests per second.
    pub rps: f64,
    #[serde(rename = "avg_latency_ms", with = "duration_ms")]
    pub avg_latency: Duration,
    /// Error rate (0.0–1.0).
    pub error_rate: f64,
    /// Utilization fractions (0.0–1.0).
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub gpu_usage: f64,
    /// `None` until the first sample lands.
    pub last_updated: Option<DateTime<Utc>>,
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

// ── Workload ───────────────────────────────────────────────────────

/// A model-serving workload and its runtime state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workload {
    pub id: WorkloadId,
    pub name: String,
    pub model_name: String,
    pub model_type: String,
    pub resources: ResourceSpec,
    pub status: WorkloadStatus,
    pub metrics: WorkloadMetrics,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Node hosting this workload; empty unless `Scheduled` or `Running`.
    #[serde(default)]
    pub assigned_node: NodeId,
}

impl Workload {
    /// A freshly admitted, unplaced workload with a single replica.
    pub fn new(id: impl Into<WorkloadId>, resources: ResourceSpec, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            model_name: String::new(),
            model_type: String::new(),
            resources,
            status: WorkloadStatus {
                phase: Phase::Pending,
                message: String::new(),
                replicas: 1,
                ready_replicas: 0,
                last_updated: now,
            },
            metrics: WorkloadMetrics::default(),
            labels: HashMap::new(),
            created_at: now,
            updated_at: now,
            assigned_node: String::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.status.phase
    }

    /// Check the record-level invariants. Returns the first violation found.
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("id must not be empty".into());
        }
        if self.status.ready_replicas > self.status.replicas {
            return Err(format!(
                "ready_replicas ({}) exceeds replicas ({})",
                self.status.ready_replicas, self.status.replicas
            ));
        }
        let placed = self.status.phase.is_placed();
        if placed && self.assigned_node.is_empty() {
            return Err(format!("phase {} requires an assigned node", self.status.phase));
        }
        if !placed && !self.assigned_node.is_empty() {
            return Err(format!(
                "phase {} must not carry an assigned node",
                self.status.phase
            ));
        }
        if self.updated_at < self.created_at {
            return Err("updated_at precedes created_at".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Workload {
        let mut w = Workload::new("a", ResourceSpec::new(1000, 2 << 30, 0), Utc::now());
        w.name = "llama".into();
        w.model_name = "llama-7b".into();
        w
    }

    #[test]
    fn new_workload_is_pending_and_valid() {
        let w = sample();
        assert_eq!(w.phase(), Phase::Pending);
        assert_eq!(w.status.replicas, 1);
        assert_eq!(w.status.ready_replicas, 0);
        assert!(w.assigned_node.is_empty());
        assert!(w.check_invariants().is_ok());
    }

    #[test]
    fn placed_phase_requires_node() {
        let mut w = sample();
        w.status.phase = Phase::Scheduled;
        assert!(w.check_invariants().is_err());

        w.assigned_node = "node-1".into();
        assert!(w.check_invariants().is_ok());

        w.status.phase = Phase::Failed;
        assert!(w.check_invariants().is_err());
    }

    #[test]
    fn ready_replicas_bounded() {
        let mut w = sample();
        w.status.ready_replicas = 2;
        assert!(w.check_invariants().is_err());
    }

    #[test]
    fn transitions_follow_state_machine() {
        use Phase::*;
        assert!(Pending.can_transition_to(Scheduled));
        assert!(Pending.can_transition_to(Failed));
        assert!(Scheduled.can_transition_to(Running));
        assert!(Running.can_transition_to(Failed));
        assert!(!Pending.can_transition_to(Running));
        assert!(!Failed.can_transition_to(Pending));
        assert!(!Completed.can_transition_to(Running));
        assert!(!Running.can_transition_to(Scheduled));
    }

    #[test]
    fn serializes_latency_as_millis() {
        let mut w = sample();
        w.metrics.avg_latency = Duration::from_millis(75);
        let json = serde_json::to_value(&w).unwrap();

        assert_eq!(json["metrics"]["avg_latency_ms"], 75);
        assert_eq!(json["status"]["phase"], "pending");
        assert!(json["status"].get("message").is_none());

        let back: Workload = serde_json::from_value(json).unwrap();
        assert_eq!(back, w);
    }
}
