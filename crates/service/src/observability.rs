//! Prometheus metrics registry and HTTP exporter.
//!
//! The exporter serves `/metrics` (Prometheus text exposition) and `/health`.
//! It is started at most once per process, before any service instance, and
//! its failure never takes an instance down with it.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use prometheus::{IntCounter, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry, TextEncoder};
use tracing::{error, info};

use crate::error::{EmulatorError, EmulatorResult};

/// Counters and gauges shared by every instance and session.
pub struct EmulatorMetrics {
    registry: Registry,
    /// gNMI RPCs received, labeled by method.
    pub rpcs_total: IntCounterVec,
    /// Synthetic notifications pushed to subscribers.
    pub notifications_total: IntCounter,
    /// Update sends that failed and terminated their session.
    pub send_failures_total: IntCounter,
    /// Subscription sessions currently emitting.
    pub active_sessions: IntGauge,
    /// Security posture per instance port (1 for the posture being served).
    pub security_posture: IntGaugeVec,
}

impl EmulatorMetrics {
    /// Create and register the emulator metric families.
    pub fn new() -> EmulatorResult<Self> {
        let registry = Registry::new();

        let rpcs_total = IntCounterVec::new(
            Opts::new("gnmi_emu_rpcs_total", "gNMI RPCs received"),
            &["method"],
        )?;
        registry.register(Box::new(rpcs_total.clone()))?;

        let notifications_total = IntCounter::new(
            "gnmi_emu_notifications_total",
            "Synthetic notifications pushed to subscribers",
        )?;
        registry.register(Box::new(notifications_total.clone()))?;

        let send_failures_total = IntCounter::new(
            "gnmi_emu_send_failures_total",
            "Update sends that failed and terminated their session",
        )?;
        registry.register(Box::new(send_failures_total.clone()))?;

        let active_sessions = IntGauge::new(
            "gnmi_emu_active_sessions",
            "Subscription sessions currently emitting",
        )?;
        registry.register(Box::new(active_sessions.clone()))?;

        let security_posture = IntGaugeVec::new(
            Opts::new(
                "gnmi_emu_security_posture",
                "Transport-security posture per instance",
            ),
            &["instance", "posture"],
        )?;
        registry.register(Box::new(security_posture.clone()))?;

        Ok(Self {
            registry,
            rpcs_total,
            notifications_total,
            send_failures_total,
            active_sessions,
            security_posture,
        })
    }

    /// Record the posture an instance ended up serving with.
    pub fn record_posture(&self, port: u16, posture_label: &str) {
        self.security_posture
            .with_label_values(&[&port.to_string(), posture_label])
            .set(1);
    }

    /// Underlying registry, for exposition.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

/// Serve the Prometheus exporter until its listener fails.
pub async fn serve_exporter(
    addr: SocketAddr,
    metrics: Arc<EmulatorMetrics>,
) -> EmulatorResult<()> {
    let app = Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .with_state(metrics);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| EmulatorError::Bind {
            addr: addr.to_string(),
            source,
        })?;
    info!("starting prometheus server on {addr}");
    axum::serve(listener, app).await?;
    Ok(())
}

/// Prometheus text exposition endpoint.
async fn metrics_handler(State(metrics): State<Arc<EmulatorMetrics>>) -> Response {
    let encoder = TextEncoder::new();
    let families = metrics.registry().gather();

    match encoder.encode_to_string(&families) {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!("failed to encode prometheus metrics: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("failed to encode metrics: {e}"),
            )
                .into_response()
        }
    }
}

/// Liveness endpoint.
async fn health_handler() -> Response {
    let health = serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now(),
        "service": "gnmi-emu",
    });

    (
        StatusCode::OK,
        [("content-type", "application/json")],
        health.to_string(),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_families_are_registered_and_exposed() {
        let metrics = EmulatorMetrics::new().expect("metrics");
        metrics.rpcs_total.with_label_values(&["Get"]).inc();
        metrics.notifications_total.inc();
        metrics.send_failures_total.inc();
        metrics.active_sessions.inc();
        metrics.record_posture(57400, "tls");

        let encoder = TextEncoder::new();
        let body = encoder
            .encode_to_string(&metrics.registry().gather())
            .expect("encode");
        assert!(body.contains("gnmi_emu_rpcs_total"));
        assert!(body.contains("gnmi_emu_notifications_total"));
        assert!(body.contains("gnmi_emu_send_failures_total"));
        assert!(body.contains("gnmi_emu_active_sessions"));
        assert!(body.contains("gnmi_emu_security_posture"));
    }

    #[test]
    fn posture_gauge_is_labeled_by_instance_and_posture() {
        let metrics = EmulatorMetrics::new().expect("metrics");
        metrics.record_posture(57400, "plaintext");
        metrics.record_posture(57401, "degraded");

        let encoder = TextEncoder::new();
        let body = encoder
            .encode_to_string(&metrics.registry().gather())
            .expect("encode");
        assert!(body.contains(r#"instance="57400""#));
        assert!(body.contains(r#"posture="plaintext""#));
        assert!(body.contains(r#"instance="57401""#));
        assert!(body.contains(r#"posture="degraded""#));
    }
}
