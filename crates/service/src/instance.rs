//! A single emulated device endpoint: one listener, one gRPC server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use gnmi_emu_schemas::gnmi::g_nmi_server::GNmiServer;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::{Server, ServerTlsConfig};
use tracing::{info, warn};

use crate::config::TlsConfig;
use crate::error::{EmulatorError, EmulatorResult};
use crate::observability::EmulatorMetrics;
use crate::target::GnmiTarget;
use crate::tls::{self, SecurityPosture};

/// One service instance, configured but not yet bound.
///
/// TLS material is loaded at construction so the resulting posture is known,
/// logged and recorded before anything touches the network.
pub struct ServiceInstance {
    address: String,
    port: u16,
    interval: Duration,
    rate: usize,
    tls_config: Option<ServerTlsConfig>,
    posture: SecurityPosture,
    metrics: Arc<EmulatorMetrics>,
    shutdown: broadcast::Receiver<()>,
}

impl ServiceInstance {
    /// Configure an instance for `address:port`.
    pub fn new(
        address: String,
        port: u16,
        interval: Duration,
        rate: usize,
        tls: &TlsConfig,
        metrics: Arc<EmulatorMetrics>,
        shutdown: broadcast::Receiver<()>,
    ) -> Self {
        let (tls_config, posture) = tls::build(tls);
        if posture.is_degraded() {
            warn!(port, "serving with degraded transport security: {posture}");
        }
        metrics.record_posture(port, posture.label());

        Self {
            address,
            port,
            interval,
            rate,
            tls_config,
            posture,
            metrics,
            shutdown,
        }
    }

    /// The transport-security state this instance will serve with.
    pub fn posture(&self) -> &SecurityPosture {
        &self.posture
    }

    /// Bind the instance's listener.
    ///
    /// A bind failure is fatal to this instance only; the caller decides what
    /// it means for any siblings.
    pub async fn bind(self) -> EmulatorResult<BoundInstance> {
        let listener = TcpListener::bind((self.address.as_str(), self.port))
            .await
            .map_err(|source| EmulatorError::Bind {
                addr: format!("{}:{}", self.address, self.port),
                source,
            })?;
        let local_addr = listener.local_addr()?;
        Ok(BoundInstance {
            inner: self,
            listener,
            local_addr,
        })
    }
}

/// An instance whose listener is bound and ready to serve.
pub struct BoundInstance {
    inner: ServiceInstance,
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl std::fmt::Debug for BoundInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundInstance")
            .field("local_addr", &self.local_addr)
            .finish_non_exhaustive()
    }
}

impl BoundInstance {
    /// Address the listener actually bound (resolves port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// The transport-security state this instance serves with.
    pub fn posture(&self) -> &SecurityPosture {
        &self.inner.posture
    }

    /// Run the accept/serve loop until the server fails or shutdown fires.
    pub async fn serve(self) -> EmulatorResult<()> {
        let BoundInstance {
            inner,
            listener,
            local_addr,
        } = self;

        let mut builder = Server::builder();
        if let Some(tls_config) = inner.tls_config {
            builder = builder.tls_config(tls_config)?;
        }

        let target = GnmiTarget::new(inner.interval, inner.rate, Arc::clone(&inner.metrics));
        info!(
            "starting gNMI server on {local_addr}, interval={:?}, rate={}, posture={}",
            inner.interval, inner.rate, inner.posture,
        );

        let mut shutdown = inner.shutdown;
        builder
            .add_service(GNmiServer::new(target))
            .serve_with_incoming_shutdown(TcpListenerStream::new(listener), async move {
                let _ = shutdown.recv().await;
            })
            .await?;
        Ok(())
    }
}
