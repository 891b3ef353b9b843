//! gNMI protobuf subset and generated gRPC bindings.
//!
//! This crate holds the wire-level contract for the emulator: a faithful
//! subset of the openconfig gNMI protocol (original field numbers) compiled
//! with tonic. Consumers reach the message types through [`gnmi`] and the
//! service plumbing through the re-exported client/server types.

/// Generated gRPC bindings for the gNMI service.
#[allow(clippy::all)]
pub mod gnmi {
    include!(concat!(env!("OUT_DIR"), "/gnmi.rs"));
}

pub use gnmi::g_nmi_client::GNmiClient;
pub use gnmi::g_nmi_server::{GNmi, GNmiServer};
