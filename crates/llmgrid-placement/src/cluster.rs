//! Cluster view — node capacities and what is already committed on them.
//!
//! Capacity comes from a [`ClusterSource`]. Commitments are supplied by the
//! caller (the scheduler derives them from the registry) so the view stays a
//! plain value that policies can inspect without touching shared state.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use llmgrid_core::{ConfigResult, NodeConfig, ResourceSpec};

/// Id of the node used when no nodes are configured.
pub const SYNTHETIC_NODE_ID: &str = "node-1";

/// Capacity and commitments for a single node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeView {
    pub id: String,
    pub capacity: ResourceSpec,
    pub committed: ResourceSpec,
}

impl NodeView {
    pub fn new(id: impl Into<String>, capacity: ResourceSpec) -> Self {
        Self {
            id: id.into(),
            capacity,
            committed: ResourceSpec::default(),
        }
    }

    /// Capacity minus commitments, saturating at zero per dimension.
    pub fn free(&self) -> ResourceSpec {
        self.capacity.saturating_sub(&self.committed)
    }
}

/// Point-in-time snapshot of the cluster, ordered by node id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterView {
    nodes: Vec<NodeView>,
}

impl ClusterView {
    /// Build a view from node capacities and per-node commitments.
    ///
    /// Commitments for nodes that are not in `capacities` are ignored.
    pub fn build(
        capacities: impl IntoIterator<Item = (String, ResourceSpec)>,
        committed: &HashMap<String, ResourceSpec>,
    ) -> Self {
        let by_id: BTreeMap<String, ResourceSpec> = capacities.into_iter().collect();
        let nodes = by_id
            .into_iter()
            .map(|(id, capacity)| NodeView {
                committed: committed.get(&id).copied().unwrap_or_default(),
                id,
                capacity,
            })
            .collect();
        Self { nodes }
    }

    pub fn nodes(&self) -> &[NodeView] {
        &self.nodes
    }

    pub fn get(&self, id: &str) -> Option<&NodeView> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }
}

/// Provides the set of schedulable nodes and their capacities.
pub trait ClusterSource: Send + Sync {
    fn capacities(&self) -> Vec<(String, ResourceSpec)>;
}

/// A fixed node list, usually taken from configuration.
#[derive(Debug, Clone)]
pub struct StaticCluster {
    nodes: Vec<(String, ResourceSpec)>,
}

impl StaticCluster {
    pub fn new(nodes: Vec<(String, ResourceSpec)>) -> Self {
        Self { nodes }
    }

    /// A single node with unbounded capacity.
    pub fn synthetic() -> Self {
        Self::new(vec![(SYNTHETIC_NODE_ID.to_string(), ResourceSpec::unbounded())])
    }

    /// Build from `[[nodes]]` config entries, falling back to the synthetic
    /// node when none are configured.
    pub fn from_config(nodes: &[NodeConfig]) -> ConfigResult<Self> {
        if nodes.is_empty() {
            return Ok(Self::synthetic());
        }
        let nodes = nodes
            .iter()
            .map(|n| Ok((n.id.clone(), n.capacity()?)))
            .collect::<ConfigResult<Vec<_>>>()?;
        Ok(Self::new(nodes))
    }
}

impl ClusterSource for StaticCluster {
    fn capacities(&self) -> Vec<(String, ResourceSpec)> {
        self.nodes.clone()
    }
}
