//! Orchestrator configuration: built-in defaults, an optional TOML file,
//! then command-line overrides (last wins).

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::duration::{format_duration, serde_human};
use crate::quantity::{QuantityError, QuantityValue};
use crate::types::ResourceSpec;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("invalid resource quantity in config: {0}")]
    Quantity(#[from] QuantityError),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Longest accepted value for any configured period.
pub const MAX_PERIOD: Duration = Duration::from_secs(24 * 60 * 60);

/// Log verbosity accepted by the orchestrator. Parsing is case-insensitive
/// for both the file and the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(ConfigError::Invalid(format!(
                "unknown log level {other:?} (expected debug|info|warn|error)"
            ))),
        }
    }
}

impl TryFrom<String> for LogLevel {
    type Error = ConfigError;

    fn try_from(s: String) -> Result<Self, ConfigError> {
        s.parse()
    }
}

/// Which placement policy the scheduler consults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlacementPolicyKind {
    #[default]
    GpuFirst,
    BinPack,
}

impl FromStr for PlacementPolicyKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "gpu-first" => Ok(PlacementPolicyKind::GpuFirst),
            "bin-pack" => Ok(PlacementPolicyKind::BinPack),
            other => Err(ConfigError::Invalid(format!(
                "unknown placement policy {other:?} (expected gpu-first|bin-pack)"
            ))),
        }
    }
}

/// A statically configured node. Omitted dimensions are unbounded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    pub id: String,
    pub cpu: Option<QuantityValue>,
    pub memory: Option<QuantityValue>,
    pub gpu: Option<u32>,
}

impl NodeConfig {
    /// Resolve this node's capacity vector.
    pub fn capacity(&self) -> ConfigResult<ResourceSpec> {
        let unbounded = ResourceSpec::unbounded();
        Ok(ResourceSpec {
            cpu: match &self.cpu {
                Some(q) => q.cpu_millis()?,
                None => unbounded.cpu,
            },
            memory: match &self.memory {
                Some(q) => q.memory_bytes()?,
                None => unbounded.memory,
            },
            gpu_count: self.gpu.unwrap_or(unbounded.gpu_count),
        })
    }
}

/// Top-level orchestrator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// API listen port.
    pub port: u16,
    pub log_level: LogLevel,
    /// Lifecycle monitor tick period.
    #[serde(with = "serde_human")]
    pub metrics_interval: Duration,
    /// How long a workload stays `Scheduled` before it is considered running.
    #[serde(with = "serde_human")]
    pub startup_grace: Duration,
    /// Upper bound on a single metrics sample.
    #[serde(with = "serde_human")]
    pub sample_timeout: Duration,
    /// Registry cap.
    pub max_workloads: usize,
    pub default_cpu: QuantityValue,
    pub default_memory: QuantityValue,
    pub default_gpu: u32,
    pub placement_policy: PlacementPolicyKind,
    /// Only refresh metrics of `Scheduled`/`Running` workloads.
    pub freeze_terminal_metrics: bool,
    /// Static cluster. Empty means a single synthetic node with unbounded capacity.
    pub nodes: Vec<NodeConfig>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            log_level: LogLevel::Info,
            metrics_interval: Duration::from_secs(30),
            startup_grace: Duration::from_secs(10),
            sample_timeout: Duration::from_secs(2),
            max_workloads: 100,
            default_cpu: QuantityValue::from("1000m"),
            default_memory: QuantityValue::from("2Gi"),
            default_gpu: 0,
            placement_policy: PlacementPolicyKind::GpuFirst,
            freeze_terminal_metrics: false,
            nodes: Vec::new(),
        }
    }
}

/// Command-line overrides applied on top of the file configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    pub port: Option<u16>,
    pub log_level: Option<LogLevel>,
    pub metrics_interval: Option<Duration>,
    pub max_workloads: Option<usize>,
}

impl OrchestratorConfig {
    /// Parse a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let config: OrchestratorConfig = toml::from_str(content)?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Resolve the effective configuration and validate it.
    pub fn resolve(file: Option<&Path>, overrides: &ConfigOverrides) -> ConfigResult<Self> {
        let mut config = match file {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply(overrides);
        config.validate()?;
        Ok(config)
    }

    pub fn apply(&mut self, overrides: &ConfigOverrides) {
        if let Some(port) = overrides.port {
            self.port = port;
        }
        if let Some(level) = overrides.log_level {
            self.log_level = level;
        }
        if let Some(interval) = overrides.metrics_interval {
            self.metrics_interval = interval;
        }
        if let Some(max) = overrides.max_workloads {
            self.max_workloads = max;
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_workloads == 0 {
            return Err(ConfigError::Invalid("max_workloads must be at least 1".into()));
        }
        if self.metrics_interval.is_zero() {
            return Err(ConfigError::Invalid("metrics_interval must be positive".into()));
        }
        if self.sample_timeout.is_zero() {
            return Err(ConfigError::Invalid("sample_timeout must be positive".into()));
        }
        for (name, value) in [
            ("metrics_interval", self.metrics_interval),
            ("startup_grace", self.startup_grace),
            ("sample_timeout", self.sample_timeout),
        ] {
            if value > MAX_PERIOD {
                return Err(ConfigError::Invalid(format!(
                    "{name} must not exceed {}",
                    format_duration(MAX_PERIOD)
                )));
            }
        }
        self.resource_defaults()?;

        let mut seen = HashSet::new();
        for node in &self.nodes {
            if node.id.trim().is_empty() {
                return Err(ConfigError::Invalid("node id must not be empty".into()));
            }
            if !seen.insert(node.id.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate node id {:?}", node.id)));
            }
            node.capacity()?;
        }
        Ok(())
    }

    /// Defaults filled into workload specs that omit a resource field.
    pub fn resource_defaults(&self) -> ConfigResult<ResourceSpec> {
        Ok(ResourceSpec {
            cpu: self.default_cpu.cpu_millis()?,
            memory: self.default_memory.memory_bytes()?,
            gpu_count: self.default_gpu,
        })
    }

    pub fn to_toml_string(&self) -> ConfigResult<String> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}
