//! llmgrid-state — in-memory workload registry for LLMGrid.
//!
//! Holds every admitted [`Workload`] record and is the single source of
//! truth read by the scheduler, the lifecycle monitor, and the control API.
//!
//! # Architecture
//!
//! ```text
//!   API handlers ──┐
//!   Scheduler ─────┼──▶ Registry ── RwLock<HashMap<WorkloadId, Workload>>
//!   Monitor ───────┘
//! ```
//!
//! Readers receive clones, so a snapshot never changes underneath them.
//! All mutations go through [`Registry::update_with`], which validates the
//! phase state machine and record invariants before committing.
//!
//! The `Registry` is `Clone` + `Send` + `Sync` (backed by `Arc<RwLock<..>>`)
//! and can be shared across async tasks.

pub mod error;
pub mod registry;
pub mod types;

pub use error::{RegistryError, RegistryResult};
pub use registry::{Registry, RegistrySummary};
pub use types::*;
