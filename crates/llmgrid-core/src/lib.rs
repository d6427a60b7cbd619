pub mod config;
pub mod duration;
pub mod quantity;
pub mod types;

pub use config::{
    ConfigError, ConfigOverrides, ConfigResult, LogLevel, MAX_PERIOD, NodeConfig, OrchestratorConfig,
    PlacementPolicyKind,
};
pub use duration::{format_duration, parse_duration};
pub use quantity::{QuantityError, QuantityValue, parse_cpu_millis, parse_memory_bytes};
pub use types::ResourceSpec;
