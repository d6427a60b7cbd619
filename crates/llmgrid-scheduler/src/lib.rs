//! llmgrid-scheduler — placement of pending workloads.
//!
//! Glues the registry (`llmgrid-state`) to a placement policy
//! (`llmgrid-placement`). The scheduler:
//!
//! - Derives per-node commitments from placed workloads
//! - Consults the configured policy
//! - Records `Scheduled` or `Failed` on the workload record
//!
//! # Architecture
//!
//! ```text
//! Scheduler
//!   ├── Registry (read snapshot, compare-and-set Pending → Scheduled/Failed)
//!   ├── ClusterSource (node capacities)
//!   └── PlacementPolicy (Admit(node) | Reject(reason))
//! ```

pub mod error;
pub mod scheduler;

pub use error::{SchedulerError, SchedulerResult};
pub use scheduler::{ScheduleOutcome, Scheduler, committed_by_node};
