//! Transport-security material loading and the resulting security posture.

use std::fmt;
use std::fs;
use std::path::Path;

use tonic::transport::{Certificate, Identity, ServerTlsConfig};
use tracing::warn;

use crate::config::TlsConfig;
use crate::error::{EmulatorError, EmulatorResult};

/// The transport-security state an instance actually serves with.
///
/// Loading TLS material is fallible and deliberately non-fatal. The posture
/// records what the instance ended up with, so a secured endpoint can be told
/// apart from a degraded one without attempting a handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecurityPosture {
    /// No TLS requested; plaintext gRPC.
    Plaintext,
    /// Serving TLS with the configured identity.
    Tls {
        /// Client certificates are verified against the configured CA bundle.
        client_auth: bool,
    },
    /// TLS was requested but some of its material failed to load.
    Degraded {
        /// What failed to load.
        reason: String,
    },
}

impl SecurityPosture {
    /// Whether the posture fell short of what the configuration asked for.
    pub fn is_degraded(&self) -> bool {
        matches!(self, SecurityPosture::Degraded { .. })
    }

    /// Short label used for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            SecurityPosture::Plaintext => "plaintext",
            SecurityPosture::Tls { client_auth: true } => "mtls",
            SecurityPosture::Tls { client_auth: false } => "tls",
            SecurityPosture::Degraded { .. } => "degraded",
        }
    }
}

impl fmt::Display for SecurityPosture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecurityPosture::Degraded { reason } => write!(f, "degraded ({reason})"),
            other => f.write_str(other.label()),
        }
    }
}

/// Build the tonic TLS configuration from on-disk material.
///
/// Returns the server TLS configuration, when one could be assembled, along
/// with the posture actually achieved. An unreadable certificate or key
/// downgrades to plaintext; an unreadable CA bundle keeps TLS but drops
/// client verification. Renegotiation never enters the picture with rustls.
pub fn build(tls: &TlsConfig) -> (Option<ServerTlsConfig>, SecurityPosture) {
    let (Some(cert), Some(key)) = (&tls.cert, &tls.key) else {
        return (None, SecurityPosture::Plaintext);
    };

    let identity = match load_identity(cert, key) {
        Ok(identity) => identity,
        Err(err) => {
            warn!("failed loading certificates: {err}");
            return (
                None,
                SecurityPosture::Degraded {
                    reason: err.to_string(),
                },
            );
        }
    };
    let config = ServerTlsConfig::new().identity(identity);

    match &tls.ca {
        Some(ca) if !tls.skip_verify => match read_pem(ca, "CA bundle") {
            Ok(pem) => (
                Some(config.client_ca_root(Certificate::from_pem(pem))),
                SecurityPosture::Tls { client_auth: true },
            ),
            Err(err) => {
                warn!("failed loading CA certificates: {err}");
                (
                    Some(config),
                    SecurityPosture::Degraded {
                        reason: err.to_string(),
                    },
                )
            }
        },
        _ => (Some(config), SecurityPosture::Tls { client_auth: false }),
    }
}

fn load_identity(cert: &Path, key: &Path) -> EmulatorResult<Identity> {
    let cert_pem = read_pem(cert, "certificate")?;
    let key_pem = read_pem(key, "private key")?;
    Ok(Identity::from_pem(cert_pem, key_pem))
}

fn read_pem(path: &Path, what: &str) -> EmulatorResult<Vec<u8>> {
    fs::read(path)
        .map_err(|e| EmulatorError::TlsSetup(format!("{what} {}: {e}", path.display())))
}
