//! gNMI target emulator daemon (gnmi-emud).

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use gnmi_emu_service::{EmulatorConfig, FailurePolicy, Launcher};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "gnmi-emud",
    version,
    about = "Synthetic gNMI telemetry target for load generation"
)]
struct Cli {
    /// Config file (YAML).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Server bind address.
    #[arg(short, long)]
    address: Option<String>,

    /// gNMI servers start port.
    #[arg(short, long)]
    port: Option<u16>,

    /// TLS certificate path.
    #[arg(long)]
    tls_cert: Option<PathBuf>,

    /// TLS key path.
    #[arg(long)]
    tls_key: Option<PathBuf>,

    /// TLS CA path.
    #[arg(long)]
    tls_ca: Option<PathBuf>,

    /// Sample interval (e.g. 1s, 250ms).
    #[arg(short, long)]
    interval: Option<humantime::Duration>,

    /// Number of updates per interval.
    #[arg(short, long)]
    rate: Option<usize>,

    /// Prometheus server address.
    #[arg(long)]
    prometheus_address: Option<SocketAddr>,

    /// Number of servers.
    #[arg(long)]
    num_servers: Option<usize>,

    /// What to do with sibling servers when one fails.
    #[arg(long, value_enum)]
    on_failure: Option<FailurePolicy>,
}

impl Cli {
    /// Flags override whatever the config file provided.
    fn apply(self, config: &mut EmulatorConfig) {
        if let Some(address) = self.address {
            config.address = address;
        }
        if let Some(port) = self.port {
            config.base_port = port;
        }
        if let Some(interval) = self.interval {
            let interval: std::time::Duration = interval.into();
            config.interval_ms = interval.as_millis() as u64;
        }
        if let Some(rate) = self.rate {
            config.rate = rate;
        }
        if let Some(cert) = self.tls_cert {
            config.tls.cert = Some(cert);
        }
        if let Some(key) = self.tls_key {
            config.tls.key = Some(key);
        }
        if let Some(ca) = self.tls_ca {
            config.tls.ca = Some(ca);
        }
        if let Some(addr) = self.prometheus_address {
            config.prometheus_address = Some(addr);
        }
        if let Some(num_servers) = self.num_servers {
            config.num_servers = num_servers;
        }
        if let Some(policy) = self.on_failure {
            config.on_instance_failure = policy;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("gnmi_emu_service=debug,info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => EmulatorConfig::load(path)
            .with_context(|| format!("loading config file {}", path.display()))?,
        None => EmulatorConfig::default(),
    };
    cli.apply(&mut config);

    info!("starting gNMI emulator v{}", env!("CARGO_PKG_VERSION"));
    let launcher = Launcher::new(config).context("invalid configuration")?;
    launcher.run().await?;

    Ok(())
}
