//! llmgrid-metrics — runtime metrics for LLMGrid workloads.
//!
//! Provides the pluggable per-workload metrics source consulted by the
//! lifecycle monitor, and Prometheus-compatible text exposition of the
//! metrics stored on workload records.
//!
//! # Architecture
//!
//! ```text
//! MetricsSource (trait)
//!   ├── SyntheticSource → clock-derived values (default)
//!   ├── FixedSource     → preset values for tests and demos
//!   └── sample_with_timeout() → bounded sampling
//!
//! Prometheus exposition
//!   └── render_prometheus() → text/plain for /metrics/prometheus
//! ```

pub mod prometheus;
pub mod source;

pub use prometheus::render_prometheus;
pub use source::{
    FixedSource, MetricsError, MetricsResult, MetricsSource, SyntheticSource, sample_with_timeout,
};
