//! Placement policies.
//!
//! A policy is a pure function of a resource request and a [`ClusterView`].
//! Both shipped policies share the same feasibility check and rejection
//! reasons; they differ only in how fitting nodes are ranked:
//!
//! - **`GpuFirst`**: most free gpus, then most free memory, then lowest id
//! - **`BinPack`**: fewest free gpus, then least free memory, then lowest id

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use llmgrid_core::{PlacementPolicyKind, ResourceSpec};

use crate::cluster::{ClusterView, NodeView};

/// Why a request could not be placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    NoNodes,
    InsufficientGpu,
    InsufficientCpu,
    InsufficientMemory,
    NoSingleNodeFits,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RejectReason::NoNodes => "no nodes available",
            RejectReason::InsufficientGpu => "insufficient gpu",
            RejectReason::InsufficientCpu => "insufficient cpu",
            RejectReason::InsufficientMemory => "insufficient memory",
            RejectReason::NoSingleNodeFits => "no node satisfies all resource requirements",
        })
    }
}

/// Outcome of a placement decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Admit(String),
    Reject(RejectReason),
}

/// Chooses a node for a resource request.
pub trait PlacementPolicy: Send + Sync {
    fn name(&self) -> &str;

    fn place(&self, spec: &ResourceSpec, view: &ClusterView) -> Decision;
}

/// Prefer the node with the most free gpus, then the most free memory.
#[derive(Debug, Clone, Copy, Default)]
pub struct GpuFirst;

impl PlacementPolicy for GpuFirst {
    fn name(&self) -> &str {
        "gpu-first"
    }

    fn place(&self, spec: &ResourceSpec, view: &ClusterView) -> Decision {
        place_with(self.name(), spec, view, |a, b| {
            let (fa, fb) = (a.free(), b.free());
            fb.gpu_count
                .cmp(&fa.gpu_count)
                .then_with(|| fb.memory.cmp(&fa.memory))
                .then_with(|| a.id.cmp(&b.id))
        })
    }
}

/// Prefer the tightest fit: fewest free gpus, then least free memory.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinPack;

impl PlacementPolicy for BinPack {
    fn name(&self) -> &str {
        "bin-pack"
    }

    fn place(&self, spec: &ResourceSpec, view: &ClusterView) -> Decision {
        place_with(self.name(), spec, view, |a, b| {
            let (fa, fb) = (a.free(), b.free());
            fa.gpu_count
                .cmp(&fb.gpu_count)
                .then_with(|| fa.memory.cmp(&fb.memory))
                .then_with(|| a.id.cmp(&b.id))
        })
    }
}

/// Build the policy selected in configuration.
pub fn policy_for(kind: PlacementPolicyKind) -> Arc<dyn PlacementPolicy> {
    match kind {
        PlacementPolicyKind::GpuFirst => Arc::new(GpuFirst),
        PlacementPolicyKind::BinPack => Arc::new(BinPack),
    }
}

/// Explain why no node fits `spec`, checking one dimension at a time.
pub fn diagnose(spec: &ResourceSpec, view: &ClusterView) -> RejectReason {
    let nodes = view.nodes();
    if nodes.is_empty() {
        return RejectReason::NoNodes;
    }
    if !nodes.iter().any(|n| n.free().gpu_count >= spec.gpu_count) {
        return RejectReason::InsufficientGpu;
    }
    if !nodes.iter().any(|n| n.free().cpu >= spec.cpu) {
        return RejectReason::InsufficientCpu;
    }
    if !nodes.iter().any(|n| n.free().memory >= spec.memory) {
        return RejectReason::InsufficientMemory;
    }
    RejectReason::NoSingleNodeFits
}

fn place_with<F>(policy: &str, spec: &ResourceSpec, view: &ClusterView, rank: F) -> Decision
where
    F: Fn(&NodeView, &NodeView) -> Ordering,
{
    let best = view
        .nodes()
        .iter()
        .filter(|n| spec.fits_within(&n.free()))
        .min_by(|a, b| rank(a, b));

    match best {
        Some(node) => {
            debug!(policy, node = %node.id, "node selected");
            Decision::Admit(node.id.clone())
        }
        None => {
            let reason = diagnose(spec, view);
            debug!(policy, %reason, "no feasible node");
            Decision::Reject(reason)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    const GI: u64 = 1 << 30;

    fn view(nodes: &[(&str, ResourceSpec)]) -> ClusterView {
        ClusterView::build(
            nodes.iter().map(|(id, cap)| (id.to_string(), *cap)),
            &HashMap::new(),
        )
    }

    #[test]
    fn empty_view_rejects() {
        let d = GpuFirst.place(&ResourceSpec::new(1, 1, 0), &ClusterView::default());
        assert_eq!(d, Decision::Reject(RejectReason::NoNodes));
        assert_eq!(RejectReason::NoNodes.to_string(), "no nodes available");
    }

    #[test]
    fn gpu_first_prefers_most_free_gpus() {
        let v = view(&[
            ("a", ResourceSpec::new(8000, 64 * GI, 1)),
            ("b", ResourceSpec::new(8000, 16 * GI, 4)),
        ]);
        let d = GpuFirst.place(&ResourceSpec::new(1000, 2 * GI, 1), &v);
        assert_eq!(d, Decision::Admit("b".into()));
    }

    #[test]
    fn gpu_first_breaks_ties_on_memory_then_id() {
        let v = view(&[
            ("c", ResourceSpec::new(8000, 16 * GI, 2)),
            ("b", ResourceSpec::new(8000, 32 * GI, 2)),
            ("a", ResourceSpec::new(8000, 32 * GI, 2)),
        ]);
        let d = GpuFirst.place(&ResourceSpec::new(1000, GI, 0), &v);
        assert_eq!(d, Decision::Admit("a".into()));
    }

    #[test]
    fn bin_pack_prefers_tightest_node() {
        let v = view(&[
            ("a", ResourceSpec::new(8000, 64 * GI, 4)),
            ("b", ResourceSpec::new(8000, 16 * GI, 1)),
        ]);
        let d = BinPack.place(&ResourceSpec::new(1000, 2 * GI, 1), &v);
        assert_eq!(d, Decision::Admit("b".into()));
    }

    #[test]
    fn rejects_insufficient_gpu_first() {
        let v = view(&[("n", ResourceSpec::new(100, GI, 0))]);
        // Every dimension is short; gpu is reported.
        let d = GpuFirst.place(&ResourceSpec::new(1000, 2 * GI, 1), &v);
        assert_eq!(d, Decision::Reject(RejectReason::InsufficientGpu));
        assert_eq!(RejectReason::InsufficientGpu.to_string(), "insufficient gpu");
    }

    #[test]
    fn rejects_cpu_then_memory() {
        let v = view(&[("n", ResourceSpec::new(500, GI, 1))]);
        assert_eq!(
            GpuFirst.place(&ResourceSpec::new(1000, 2 * GI, 0), &v),
            Decision::Reject(RejectReason::InsufficientCpu)
        );
        assert_eq!(
            GpuFirst.place(&ResourceSpec::new(100, 2 * GI, 0), &v),
            Decision::Reject(RejectReason::InsufficientMemory)
        );
    }

    #[test]
    fn rejects_when_dimensions_fit_on_different_nodes() {
        let v = view(&[
            ("gpu-only", ResourceSpec::new(100, GI, 2)),
            ("cpu-only", ResourceSpec::new(8000, 32 * GI, 0)),
        ]);
        let d = GpuFirst.place(&ResourceSpec::new(1000, 2 * GI, 1), &v);
        assert_eq!(d, Decision::Reject(RejectReason::NoSingleNodeFits));
    }

    #[test]
    fn commitments_reduce_free_capacity() {
        let committed = HashMap::from([("a".to_string(), ResourceSpec::new(0, 0, 1))]);
        let v = ClusterView::build(
            vec![("a".to_string(), ResourceSpec::new(8000, 32 * GI, 1))],
            &committed,
        );
        let d = GpuFirst.place(&ResourceSpec::new(1000, GI, 1), &v);
        assert_eq!(d, Decision::Reject(RejectReason::InsufficientGpu));
    }

    #[test]
    fn unbounded_node_admits_anything() {
        let v = view(&[("node-1", ResourceSpec::unbounded())]);
        let d = GpuFirst.place(&ResourceSpec::new(u64::MAX, u64::MAX, 64), &v);
        assert_eq!(d, Decision::Admit("node-1".into()));
    }

    #[test]
    fn policy_for_selects_by_kind() {
        assert_eq!(policy_for(PlacementPolicyKind::GpuFirst).name(), "gpu-first");
        assert_eq!(policy_for(PlacementPolicyKind::BinPack).name(), "bin-pack");
    }
}
