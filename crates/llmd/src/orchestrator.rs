//! Orchestrator runtime — assembles the components and supervises them.
//!
//! Startup builds, in order:
//! 1. The workload registry
//! 2. The cluster source and placement policy
//! 3. The scheduler
//! 4. The metrics source and lifecycle monitor
//! 5. The control API and its router
//!
//! [`Orchestrator::run`] serves the API and runs the monitor until the
//! shutdown future resolves, then drains both within a fixed deadline.
//! Either task stopping on its own is fatal: the other is told to stop and
//! `run` returns an error.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tracing::{error, info, warn};

use llmgrid_api::{ControlApi, build_router};
use llmgrid_core::OrchestratorConfig;
use llmgrid_lifecycle::{LifecycleMonitor, MonitorSettings};
use llmgrid_metrics::{MetricsSource, SyntheticSource};
use llmgrid_placement::{ClusterSource, StaticCluster, policy_for};
use llmgrid_scheduler::Scheduler;
use llmgrid_state::Registry;

/// Upper bound on draining requests and stopping the monitor.
pub const SHUTDOWN_DEADLINE: Duration = Duration::from_secs(30);

pub struct Orchestrator {
    config: OrchestratorConfig,
    api: ControlApi,
    monitor: LifecycleMonitor,
}

impl Orchestrator {
    /// Build with the synthetic metrics source.
    pub fn build(config: OrchestratorConfig) -> anyhow::Result<Self> {
        Self::with_source(config, Arc::new(SyntheticSource))
    }

    pub fn with_source(
        config: OrchestratorConfig,
        source: Arc<dyn MetricsSource>,
    ) -> anyhow::Result<Self> {
        let started = Instant::now();

        // ── Registry ───────────────────────────────────────────────
        let registry = Registry::new(config.max_workloads);

        // ── Placement ──────────────────────────────────────────────
        let cluster = StaticCluster::from_config(&config.nodes)?;
        let nodes = cluster.capacities().len();
        let policy = policy_for(config.placement_policy);
        info!(nodes, policy = policy.name(), "placement initialized");

        // ── Scheduler ──────────────────────────────────────────────
        let scheduler = Scheduler::new(registry.clone(), Arc::new(cluster), policy);

        // ── Lifecycle monitor ──────────────────────────────────────
        let monitor = LifecycleMonitor::new(
            registry.clone(),
            source,
            MonitorSettings::from_config(&config),
        );

        // ── Control API ────────────────────────────────────────────
        let defaults = config.resource_defaults()?;
        let api = ControlApi::new(registry, scheduler, defaults).with_start_time(started);

        Ok(Self {
            config,
            api,
            monitor,
        })
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn api(&self) -> &ControlApi {
        &self.api
    }

    pub fn monitor_mut(&mut self) -> &mut LifecycleMonitor {
        &mut self.monitor
    }

    pub fn router(&self) -> Router {
        build_router(self.api.clone())
    }

    /// Serve the API on `listener` until `shutdown` resolves.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let router = self.router();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        // ── Background tasks ───────────────────────────────────────
        let monitor_handle = tokio::spawn(self.monitor.run(shutdown_rx.clone()));

        let mut server_shutdown = shutdown_rx;
        let server_handle = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    let _ = server_shutdown.wait_for(|stop| *stop).await;
                })
                .await
        });

        supervise(shutdown, shutdown_tx, server_handle, monitor_handle).await?;

        info!("orchestrator stopped");
        Ok(())
    }
}

/// Why the supervisor stopped waiting.
enum Exit {
    Signal,
    Server(Result<std::io::Result<()>, JoinError>),
    Monitor(Result<(), JoinError>),
}

/// Wait for `shutdown` or for either task to stop, broadcast shutdown, then
/// drain what is left within [`SHUTDOWN_DEADLINE`].
async fn supervise<F>(
    shutdown: F,
    shutdown_tx: watch::Sender<bool>,
    mut server: JoinHandle<std::io::Result<()>>,
    mut monitor: JoinHandle<()>,
) -> anyhow::Result<()>
where
    F: Future<Output = ()>,
{
    let exit = tokio::select! {
        _ = shutdown => {
            info!("shutdown signal received");
            Exit::Signal
        }
        result = &mut server => Exit::Server(result),
        result = &mut monitor => Exit::Monitor(result),
    };
    let _ = shutdown_tx.send(true);

    match exit {
        Exit::Signal => {
            let drain = async {
                let served = server.await;
                log_monitor_exit(monitor.await);
                served
            };
            match tokio::time::timeout(SHUTDOWN_DEADLINE, drain).await {
                Ok(served) => served??,
                Err(_) => warn!(
                    deadline = ?SHUTDOWN_DEADLINE,
                    "shutdown deadline exceeded, abandoning remaining tasks"
                ),
            }
            Ok(())
        }
        Exit::Server(result) => {
            error!("API server stopped before shutdown was requested");
            match tokio::time::timeout(SHUTDOWN_DEADLINE, monitor).await {
                Ok(joined) => log_monitor_exit(joined),
                Err(_) => warn!(deadline = ?SHUTDOWN_DEADLINE, "lifecycle monitor did not stop in time"),
            }
            result??;
            anyhow::bail!("API server exited unexpectedly");
        }
        Exit::Monitor(result) => {
            error!("lifecycle monitor stopped before shutdown was requested");
            match tokio::time::timeout(SHUTDOWN_DEADLINE, server).await {
                Ok(Ok(Ok(()))) => {}
                Ok(Ok(Err(e))) => warn!(error = %e, "API server failed while draining"),
                Ok(Err(e)) => warn!(error = %e, "API server task failed while draining"),
                Err(_) => warn!(deadline = ?SHUTDOWN_DEADLINE, "API server did not drain in time"),
            }
            match result {
                Ok(()) => anyhow::bail!("lifecycle monitor exited unexpectedly"),
                Err(e) => anyhow::bail!("lifecycle monitor failed: {e}"),
            }
        }
    }
}

fn log_monitor_exit(joined: Result<(), JoinError>) {
    if let Err(e) = joined {
        error!(error = %e, "lifecycle monitor failed");
    }
}
