//! Emulator-specific error types

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Convenience alias for emulator results.
pub type EmulatorResult<T> = Result<T, EmulatorError>;

/// Emulator error type
#[derive(Debug, Error)]
pub enum EmulatorError {
    /// Configuration file could not be read or parsed
    #[error("failed to load configuration {}: {reason}", path.display())]
    ConfigLoad {
        /// Configuration file path
        path: PathBuf,
        /// Underlying failure
        reason: String,
    },

    /// Configuration value rejected at validation
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// TLS material could not be loaded
    #[error("failed to load TLS material: {0}")]
    TlsSetup(String),

    /// Listener could not be bound
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Requested bind address
        addr: String,
        /// Underlying IO failure
        #[source]
        source: io::Error,
    },

    /// gRPC transport failure
    #[error("transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    /// Metrics registration or encoding failure
    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}
