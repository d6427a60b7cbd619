//! llmd — the LLMGrid orchestrator daemon.
//!
//! Assembles every LLMGrid subsystem into one process:
//! - Workload registry
//! - Placement policy + scheduler
//! - Metrics source + lifecycle monitor
//! - REST control API
//!
//! The binary in `main.rs` only parses flags, initializes tracing, and
//! hands a resolved configuration to [`Orchestrator`].

pub mod orchestrator;

pub use orchestrator::{Orchestrator, SHUTDOWN_DEADLINE};
