//! llmd — the LLMGrid orchestrator daemon.
//!
//! # Usage
//!
//! ```text
//! llmd --config /etc/llmgrid/llmd.toml --port 8080 --log-level debug
//! ```
//!
//! Configuration is resolved as defaults, then the TOML file, then flags.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use llmd::Orchestrator;
use llmgrid_core::{ConfigOverrides, LogLevel, OrchestratorConfig, format_duration, parse_duration};

#[derive(Parser)]
#[command(name = "llmd", version, about = "LLMGrid orchestrator daemon")]
struct Cli {
    /// TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Port to listen on.
    #[arg(long)]
    port: Option<u16>,

    /// Log level: debug, info, warn or error. `RUST_LOG` takes precedence.
    #[arg(long)]
    log_level: Option<LogLevel>,

    /// Lifecycle monitor interval ("30s", "500ms", or bare seconds).
    #[arg(long, value_parser = parse_interval)]
    metrics_interval: Option<Duration>,

    /// Maximum number of workloads held in the registry.
    #[arg(long)]
    max_workloads: Option<usize>,

    /// Emit logs as JSON lines.
    #[arg(long)]
    log_json: bool,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            port: self.port,
            log_level: self.log_level,
            metrics_interval: self.metrics_interval,
            max_workloads: self.max_workloads,
        }
    }
}

fn parse_interval(s: &str) -> Result<Duration, String> {
    parse_duration(s).ok_or_else(|| format!("invalid duration {s:?}"))
}

fn init_tracing(level: LogLevel, json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = OrchestratorConfig::resolve(cli.config.as_deref(), &cli.overrides())?;

    init_tracing(config.log_level, cli.log_json);

    info!(
        port = config.port,
        max_workloads = config.max_workloads,
        metrics_interval = %format_duration(config.metrics_interval),
        startup_grace = %format_duration(config.startup_grace),
        "LLMGrid orchestrator starting"
    );

    let orchestrator = Orchestrator::build(config)?;
    let addr = SocketAddr::from(([0, 0, 0, 0], orchestrator.config().port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "API server listening");

    orchestrator.run(listener, shutdown_signal()).await
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to install ctrl-c handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
