//! Synthetic gNMI telemetry target for test and load generation.
//!
//! One process exposes `num_servers` independent gNMI endpoints on
//! sequential ports. Each endpoint speaks the four gNMI RPCs: Capabilities,
//! Get and Set fail with `Unimplemented`, while Subscribe accepts a
//! bidirectional stream and pushes synthetic interface-statistics
//! notifications at a fixed interval and rate.
//!
//! # Architecture
//!
//! - [`launcher`]: starts the metrics exporter and N service instances
//! - [`instance`]: one listener + gRPC server pair
//! - [`target`]: the gNMI RPC surface and per-stream subscribe handler
//! - [`session`]: the periodic update push loop
//! - [`generator`]: pure synthetic-notification construction
//! - [`tls`]: transport-security loading and the resulting posture
//! - [`config`], [`error`], [`observability`]: supporting cast
//!
//! # Example
//!
//! ```no_run
//! use gnmi_emu_service::{EmulatorConfig, Launcher};
//!
//! async fn run() -> gnmi_emu_service::EmulatorResult<()> {
//!     let config = EmulatorConfig::default();
//!     Launcher::new(config)?.run().await
//! }
//! ```

#![warn(missing_docs, rust_2018_idioms)]

pub mod config;
pub mod error;
pub mod generator;
pub mod instance;
pub mod launcher;
pub mod observability;
pub mod session;
pub mod target;
pub mod tls;

pub use config::{EmulatorConfig, FailurePolicy, TlsConfig};
pub use error::{EmulatorError, EmulatorResult};
pub use instance::{BoundInstance, ServiceInstance};
pub use launcher::Launcher;
pub use target::GnmiTarget;
pub use tls::SecurityPosture;
