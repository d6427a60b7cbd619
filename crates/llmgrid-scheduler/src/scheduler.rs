//! Scheduler — moves pending workloads onto nodes.
//!
//! For each request the `Scheduler`:
//! - Builds a cluster view from the cluster source and the registry
//! - Asks the placement policy for a decision
//! - Records the outcome on the registry, re-checking that the workload is
//!   still pending under the registry lock
//!
//! There are no retries. A rejected workload is marked failed with the
//! policy's reason and stays that way.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use llmgrid_placement::{ClusterSource, ClusterView, Decision, PlacementPolicy};
use llmgrid_state::*;

use crate::error::{SchedulerError, SchedulerResult};

/// Result of a successful placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleOutcome {
    pub id: WorkloadId,
    pub node: NodeId,
    pub time: DateTime<Utc>,
    pub status: String,
}

/// Drives pending workloads through a placement policy.
#[derive(Clone)]
pub struct Scheduler {
    registry: Registry,
    cluster: Arc<dyn ClusterSource>,
    policy: Arc<dyn PlacementPolicy>,
}

impl Scheduler {
    pub fn new(
        registry: Registry,
        cluster: Arc<dyn ClusterSource>,
        policy: Arc<dyn PlacementPolicy>,
    ) -> Self {
        Self {
            registry,
            cluster,
            policy,
        }
    }

    pub fn policy_name(&self) -> &str {
        self.policy.name()
    }

    /// Snapshot of node capacities minus what placed workloads hold.
    pub fn cluster_view(&self) -> ClusterView {
        let committed = committed_by_node(&self.registry.list());
        ClusterView::build(self.cluster.capacities(), &committed)
    }

    /// Place a pending workload.
    ///
    /// On admission the workload becomes `Scheduled` on the chosen node. On
    /// rejection it becomes `Failed` with the reason in `status.message`,
    /// and `Rejected` is returned.
    pub fn schedule(&self, id: &str) -> SchedulerResult<ScheduleOutcome> {
        let workload = self.registry.get(id)?;
        ensure_pending(&workload)?;

        let view = self.cluster_view();
        let decision = self.policy.place(&workload.resources, &view);

        let decision = self.registry.update_with(id, |w| {
            // The workload may have moved on since the snapshot.
            ensure_pending(w)?;
            match &decision {
                Decision::Admit(node) => {
                    w.status.phase = Phase::Scheduled;
                    w.status.message.clear();
                    w.assigned_node = node.clone();
                }
                Decision::Reject(reason) => {
                    w.status.phase = Phase::Failed;
                    w.status.message = reason.to_string();
                }
            }
            Ok::<_, SchedulerError>(decision.clone())
        })?;

        match decision {
            Decision::Admit(node) => {
                info!(workload = %id, node = %node, policy = self.policy.name(), "workload scheduled");
                Ok(ScheduleOutcome {
                    id: id.to_string(),
                    node,
                    time: Utc::now(),
                    status: Phase::Scheduled.to_string(),
                })
            }
            Decision::Reject(reason) => {
                warn!(workload = %id, %reason, policy = self.policy.name(), "workload rejected");
                Err(SchedulerError::Rejected(reason.to_string()))
            }
        }
    }
}

/// Sum the resources of placed workloads per node.
pub fn committed_by_node(workloads: &[Workload]) -> HashMap<NodeId, ResourceSpec> {
    let mut committed: HashMap<NodeId, ResourceSpec> = HashMap::new();
    for w in workloads.iter().filter(|w| w.phase().is_placed()) {
        let entry = committed.entry(w.assigned_node.clone()).or_default();
        *entry = entry.saturating_add(&w.resources);
    }
    committed
}

fn ensure_pending(w: &Workload) -> SchedulerResult<()> {
    if w.phase() != Phase::Pending {
        return Err(SchedulerError::InvalidState {
            id: w.id.clone(),
            phase: w.phase(),
        });
    }
    Ok(())
}
