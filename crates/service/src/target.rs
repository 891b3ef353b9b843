//! The gNMI RPC surface: stub unary operations plus the subscribe handler.

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use gnmi_emu_schemas::gnmi::g_nmi_server::GNmi;
use gnmi_emu_schemas::gnmi::{
    subscribe_request, CapabilityRequest, CapabilityResponse, GetRequest, GetResponse, SetRequest,
    SetResponse, SubscribeRequest, SubscribeResponse,
};
use tokio::sync::{mpsc, watch};
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::Stream;
use tonic::{Request, Response, Status, Streaming};
use tracing::{debug, info, warn};

use crate::observability::EmulatorMetrics;
use crate::session::SubscriptionSession;

/// Buffered updates per subscribe call before emission backpressures.
const SUBSCRIBE_BUFFER: usize = 64;

/// Stream of subscribe responses handed back to tonic.
pub type SubscribeResponseStream =
    Pin<Box<dyn Stream<Item = Result<SubscribeResponse, Status>> + Send>>;

/// One emulated device endpoint's RPC surface.
///
/// Capabilities, Get and Set are intentionally unimplemented. Subscribe runs
/// the per-stream handler loop: every inbound subscribe request starts an
/// independent [`SubscriptionSession`] pushing into the same response stream.
pub struct GnmiTarget {
    interval: Duration,
    rate: usize,
    metrics: Arc<EmulatorMetrics>,
}

impl GnmiTarget {
    /// Create the service for one instance.
    pub fn new(interval: Duration, rate: usize, metrics: Arc<EmulatorMetrics>) -> Self {
        Self {
            interval,
            rate,
            metrics,
        }
    }
}

#[async_trait]
impl GNmi for GnmiTarget {
    async fn capabilities(
        &self,
        _request: Request<CapabilityRequest>,
    ) -> Result<Response<CapabilityResponse>, Status> {
        self.metrics
            .rpcs_total
            .with_label_values(&["Capabilities"])
            .inc();
        Err(Status::unimplemented("method Capabilities not implemented"))
    }

    async fn get(&self, _request: Request<GetRequest>) -> Result<Response<GetResponse>, Status> {
        self.metrics.rpcs_total.with_label_values(&["Get"]).inc();
        Err(Status::unimplemented("method Get not implemented"))
    }

    async fn set(&self, _request: Request<SetRequest>) -> Result<Response<SetResponse>, Status> {
        self.metrics.rpcs_total.with_label_values(&["Set"]).inc();
        Err(Status::unimplemented("method Set not implemented"))
    }

    type SubscribeStream = SubscribeResponseStream;

    async fn subscribe(
        &self,
        request: Request<Streaming<SubscribeRequest>>,
    ) -> Result<Response<Self::SubscribeStream>, Status> {
        self.metrics
            .rpcs_total
            .with_label_values(&["Subscribe"])
            .inc();

        let peer = request
            .remote_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let mut inbound = request.into_inner();
        let (tx, rx) = mpsc::channel(SUBSCRIBE_BUFFER);
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let interval = self.interval;
        let rate = self.rate;
        let metrics = Arc::clone(&self.metrics);

        tokio::spawn(async move {
            // Dropping this at the end of the read loop cancels every session
            // the stream started.
            let _cancel = cancel_tx;
            loop {
                match inbound.message().await {
                    Ok(Some(request)) => {
                        debug!(peer = %peer, "rcv subscribe request: {request:?}");
                        if let Some(subscribe_request::Request::Subscribe(_)) = request.request {
                            let session = SubscriptionSession::new(
                                tx.clone(),
                                interval,
                                rate,
                                cancel_rx.clone(),
                                Arc::clone(&metrics),
                            );
                            info!(
                                peer = %peer,
                                session = %session.id(),
                                "starting session for subscribe request",
                            );
                            tokio::spawn(session.run());
                        }
                        // Other request variants are accepted and ignored.
                    }
                    Ok(None) => {
                        debug!(peer = %peer, "subscribe stream closed by peer");
                        break;
                    }
                    Err(status) => {
                        warn!(peer = %peer, "failed subscribe rcv: {status}");
                        let _ = tx.send(Err(status)).await;
                        break;
                    }
                }
            }
        });

        Ok(Response::new(Box::pin(ReceiverStream::new(rx))))
    }
}
