//! llmgrid-lifecycle — periodic metrics refresh and phase advancement.
//!
//! A single background task pulls metrics from a `MetricsSource` into the
//! registry and moves workloads through their lifecycle.
//!
//! # Architecture
//!
//! ```text
//! LifecycleMonitor
//!   ├── interval (MissedTickBehavior::Delay, ticks never overlap)
//!   ├── tick_at(now)
//!   │   ├── Registry::list() snapshot
//!   │   ├── MetricsSource::sample() per workload, bounded by sample_timeout
//!   │   └── Registry::update_with() per workload (metrics + phase rules)
//!   └── ErrorRateTracker (consecutive high-error-rate samples)
//! ```
//!
//! # Phase rules
//!
//! `Scheduled` workloads become `Running` once they have been scheduled for
//! longer than `startup_grace`. `Running` workloads whose error rate exceeds
//! 0.5 on two consecutive successful samples become `Failed` and release
//! their node.

pub mod monitor;
pub mod tracker;

pub use monitor::{ERROR_RATE_MESSAGE, LifecycleMonitor, MonitorSettings, TickReport};
pub use tracker::ErrorRateTracker;
