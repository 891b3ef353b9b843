//! Multi-instance launch and supervision.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::config::{EmulatorConfig, FailurePolicy};
use crate::error::EmulatorResult;
use crate::instance::ServiceInstance;
use crate::observability::{self, EmulatorMetrics};

/// Launches N service instances on sequential ports and waits for all of
/// them. Instance failures stay local unless the fail-fast policy is set.
pub struct Launcher {
    config: EmulatorConfig,
    metrics: Arc<EmulatorMetrics>,
}

impl Launcher {
    /// Validate the configuration and prepare the shared metrics registry.
    pub fn new(config: EmulatorConfig) -> EmulatorResult<Self> {
        config.validate()?;
        let metrics = Arc::new(EmulatorMetrics::new()?);
        Ok(Self { config, metrics })
    }

    /// Shared metrics handle, for embedding and tests.
    pub fn metrics(&self) -> Arc<EmulatorMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Run every instance to completion.
    ///
    /// The metrics exporter, when configured, starts once before any
    /// instance. The call returns once every instance task has finished;
    /// instance failures are logged, never escalated into the return value.
    pub async fn run(self) -> EmulatorResult<()> {
        if let Some(addr) = self.config.prometheus_address {
            let metrics = Arc::clone(&self.metrics);
            tokio::spawn(async move {
                if let Err(err) = observability::serve_exporter(addr, metrics).await {
                    warn!("prometheus server terminated: {err}");
                }
            });
        }

        let (shutdown_tx, _) = broadcast::channel(1);
        let mut instances = JoinSet::new();
        for index in 0..self.config.num_servers {
            let port = self.config.instance_port(index);
            let instance = ServiceInstance::new(
                self.config.address.clone(),
                port,
                self.config.interval(),
                self.config.rate,
                &self.config.tls,
                Arc::clone(&self.metrics),
                shutdown_tx.subscribe(),
            );
            instances.spawn(async move {
                let result = match instance.bind().await {
                    Ok(bound) => bound.serve().await,
                    Err(err) => Err(err),
                };
                (port, result)
            });
        }

        let fail_fast = self.config.on_instance_failure == FailurePolicy::FailFast;
        while let Some(joined) = instances.join_next().await {
            match joined {
                Ok((port, Ok(()))) => info!(port, "gNMI server exited"),
                Ok((port, Err(err))) => {
                    error!(port, "gNMI server failed: {err}");
                    if fail_fast {
                        // Wake every sibling's shutdown future; repeats are
                        // harmless.
                        let _ = shutdown_tx.send(());
                    }
                }
                Err(join_err) => error!("gNMI server task aborted: {join_err}"),
            }
        }

        Ok(())
    }
}
