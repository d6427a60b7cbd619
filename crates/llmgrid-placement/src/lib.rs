//! LLMGrid placement — node selection for model-serving workloads.
//!
//! This crate only decides. It does not touch the registry: callers hand in
//! a [`ClusterView`] (capacities plus commitments) and act on the returned
//! [`Decision`].
//!
//! # Components
//!
//! - **`cluster`** — Node capacity sources and the point-in-time cluster view
//! - **`policy`** — The `PlacementPolicy` trait, `GpuFirst` and `BinPack`

pub mod cluster;
pub mod policy;

pub use cluster::{ClusterSource, ClusterView, NodeView, SYNTHETIC_NODE_ID, StaticCluster};
pub use policy::{BinPack, Decision, GpuFirst, PlacementPolicy, RejectReason, diagnose, policy_for};
