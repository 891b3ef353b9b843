//! Emulator configuration: defaults, YAML file loading, validation.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{EmulatorError, EmulatorResult};

/// First gNMI port when none is configured.
pub const DEFAULT_BASE_PORT: u16 = 57400;
/// Sample interval when none is configured.
pub const DEFAULT_INTERVAL_MS: u64 = 1000;
/// Updates per interval when none is configured.
pub const DEFAULT_RATE: usize = 1;
/// Replica count when none is configured.
pub const DEFAULT_NUM_SERVERS: usize = 1;

/// Supervision policy applied when a service instance terminates with an error.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Sibling instances keep serving; the failure is logged and absorbed.
    #[default]
    BestEffort,
    /// The first failing instance shuts down every sibling instance.
    FailFast,
}

/// TLS material locations shared by all instances.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TlsConfig {
    /// PEM-encoded server certificate path.
    pub cert: Option<PathBuf>,
    /// PEM-encoded private key path.
    pub key: Option<PathBuf>,
    /// PEM-encoded CA bundle used to verify client certificates.
    pub ca: Option<PathBuf>,
    /// Skip client-certificate verification even when a CA bundle is configured.
    pub skip_verify: bool,
}

impl TlsConfig {
    /// TLS is requested once both a certificate and a key are configured.
    pub fn requested(&self) -> bool {
        self.cert.is_some() && self.key.is_some()
    }
}

/// Top-level emulator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmulatorConfig {
    /// Bind address shared by all instances.
    pub address: String,
    /// First gNMI port; instance `i` binds `base_port + i`.
    pub base_port: u16,
    /// Number of service instances to launch.
    pub num_servers: usize,
    /// Sample interval between update bursts, in milliseconds.
    pub interval_ms: u64,
    /// Updates emitted per interval.
    pub rate: usize,
    /// TLS material shared by all instances.
    pub tls: TlsConfig,
    /// Prometheus exporter bind address; unset disables the exporter.
    pub prometheus_address: Option<SocketAddr>,
    /// What happens to sibling instances when one fails.
    pub on_instance_failure: FailurePolicy,
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".to_string(),
            base_port: DEFAULT_BASE_PORT,
            num_servers: DEFAULT_NUM_SERVERS,
            interval_ms: DEFAULT_INTERVAL_MS,
            rate: DEFAULT_RATE,
            tls: TlsConfig::default(),
            prometheus_address: None,
            on_instance_failure: FailurePolicy::default(),
        }
    }
}

impl EmulatorConfig {
    /// Load configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> EmulatorResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| EmulatorError::ConfigLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let config: Self = serde_yaml::from_str(&raw).map_err(|e| EmulatorError::ConfigLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the launcher cannot honor.
    pub fn validate(&self) -> EmulatorResult<()> {
        if self.num_servers == 0 {
            return Err(EmulatorError::InvalidConfig(
                "num_servers must be at least 1".to_string(),
            ));
        }
        if self.rate == 0 {
            return Err(EmulatorError::InvalidConfig(
                "rate must be at least 1".to_string(),
            ));
        }
        if self.interval_ms == 0 {
            return Err(EmulatorError::InvalidConfig(
                "interval must be non-zero".to_string(),
            ));
        }
        let span = self.num_servers.saturating_sub(1);
        if usize::from(self.base_port).saturating_add(span) > usize::from(u16::MAX) {
            return Err(EmulatorError::InvalidConfig(format!(
                "{} replicas starting at port {} exceed the port range",
                self.num_servers, self.base_port
            )));
        }
        Ok(())
    }

    /// Sample interval as a [`Duration`].
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Port bound by instance `index`.
    pub fn instance_port(&self, index: usize) -> u16 {
        self.base_port + index as u16
    }
}
