//! Subscription sessions: the periodic synthetic-update push loop.

use std::sync::Arc;
use std::time::Duration;

use gnmi_emu_schemas::gnmi::{subscribe_response, SubscribeResponse};
use tokio::sync::{mpsc, watch};
use tokio::time::{self, MissedTickBehavior};
use tonic::Status;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::generator;
use crate::observability::EmulatorMetrics;

/// Outbound half of a subscribe call's response channel.
pub type UpdateSender = mpsc::Sender<Result<SubscribeResponse, Status>>;

/// One active subscription: emits `rate` notifications every interval until
/// its stream goes away or the owning handler cancels it.
pub struct SubscriptionSession {
    id: Uuid,
    sender: UpdateSender,
    interval: Duration,
    rate: usize,
    cancel: watch::Receiver<bool>,
    metrics: Arc<EmulatorMetrics>,
}

impl SubscriptionSession {
    /// Create a session bound to one subscribe stream.
    pub fn new(
        sender: UpdateSender,
        interval: Duration,
        rate: usize,
        cancel: watch::Receiver<bool>,
        metrics: Arc<EmulatorMetrics>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender,
            interval,
            rate,
            cancel,
            metrics,
        }
    }

    /// Session identifier for logs.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Run the periodic emission loop.
    ///
    /// The first burst fires one full interval after start. Bursts run
    /// strictly sequentially; ticks missed while a burst is in flight are
    /// skipped, not replayed. The loop ends when the cancel channel fires or
    /// its sender is dropped, or when a send fails.
    pub async fn run(mut self) {
        let mut ticker = time::interval_at(time::Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        self.metrics.active_sessions.inc();
        debug!(
            session = %self.id,
            interval = ?self.interval,
            rate = self.rate,
            "subscription session started",
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if !self.burst().await {
                        break;
                    }
                }
                changed = self.cancel.changed() => {
                    if changed.is_err() || *self.cancel.borrow() {
                        debug!(session = %self.id, "subscription session cancelled");
                        break;
                    }
                }
            }
        }

        self.metrics.active_sessions.dec();
    }

    /// Emit one burst of `rate` notifications; false once the stream is gone.
    async fn burst(&self) -> bool {
        for index in 0..self.rate {
            let response = SubscribeResponse {
                response: Some(subscribe_response::Response::Update(
                    generator::notification(index, generator::now_ns()),
                )),
            };
            if self.sender.send(Ok(response)).await.is_err() {
                warn!(session = %self.id, "failed to send response, ending session");
                self.metrics.send_failures_total.inc();
                return false;
            }
            self.metrics.notifications_total.inc();
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use gnmi_emu_schemas::gnmi::subscribe_response::Response;
    use tokio::time::timeout;

    fn metrics() -> Arc<EmulatorMetrics> {
        Arc::new(EmulatorMetrics::new().expect("metrics"))
    }

    fn port_id(response: Result<SubscribeResponse, Status>) -> String {
        let Some(Response::Update(notification)) = response.expect("ok response").response else {
            panic!("expected update response");
        };
        notification.prefix.expect("prefix").elem[1].key["port-id"].clone()
    }

    #[tokio::test(start_paused = true)]
    async fn emits_rate_updates_per_interval_in_index_order() {
        let (tx, mut rx) = mpsc::channel(16);
        let (_cancel_tx, cancel_rx) = watch::channel(false);
        let session =
            SubscriptionSession::new(tx, Duration::from_millis(20), 3, cancel_rx, metrics());
        let worker = tokio::spawn(session.run());

        let mut port_ids = Vec::new();
        for _ in 0..6 {
            let item = timeout(Duration::from_secs(2), rx.recv())
                .await
                .expect("timely")
                .expect("stream open");
            port_ids.push(port_id(item));
        }
        assert_eq!(
            port_ids,
            ["1/1/1", "1/1/2", "1/1/3", "1/1/1", "1/1/2", "1/1/3"],
        );
        worker.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn first_burst_waits_a_full_interval() {
        let (tx, mut rx) = mpsc::channel(4);
        let (_cancel_tx, cancel_rx) = watch::channel(false);
        let session =
            SubscriptionSession::new(tx, Duration::from_millis(200), 1, cancel_rx, metrics());
        let worker = tokio::spawn(session.run());

        assert!(timeout(Duration::from_millis(100), rx.recv()).await.is_err());
        assert!(timeout(Duration::from_millis(500), rx.recv())
            .await
            .expect("first burst")
            .is_some());
        worker.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn timestamps_match_their_payload() {
        let (tx, mut rx) = mpsc::channel(4);
        let (_cancel_tx, cancel_rx) = watch::channel(false);
        let session =
            SubscriptionSession::new(tx, Duration::from_millis(10), 1, cancel_rx, metrics());
        let worker = tokio::spawn(session.run());

        let item = timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("timely")
            .expect("stream open");
        let Some(Response::Update(notification)) = item.expect("ok response").response else {
            panic!("expected update response");
        };
        let val = notification.update[0].val.as_ref().expect("val");
        let Some(gnmi_emu_schemas::gnmi::typed_value::Value::JsonVal(raw)) = &val.value else {
            panic!("expected json value");
        };
        let value: i64 = std::str::from_utf8(raw)
            .expect("utf8")
            .parse()
            .expect("decimal");
        assert_eq!(value, notification.timestamp);
        worker.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn ends_promptly_when_cancelled() {
        let (tx, mut rx) = mpsc::channel(4);
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let session =
            SubscriptionSession::new(tx, Duration::from_secs(3600), 1, cancel_rx, metrics());
        let worker = tokio::spawn(session.run());

        cancel_tx.send(true).expect("session listening");
        timeout(Duration::from_secs(1), worker)
            .await
            .expect("prompt exit")
            .expect("no panic");
        // Nothing was emitted before cancellation kicked in.
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn ends_promptly_when_cancel_sender_is_dropped() {
        let (tx, _rx) = mpsc::channel(4);
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let session =
            SubscriptionSession::new(tx, Duration::from_secs(3600), 1, cancel_rx, metrics());
        let worker = tokio::spawn(session.run());

        drop(cancel_tx);
        timeout(Duration::from_secs(1), worker)
            .await
            .expect("prompt exit")
            .expect("no panic");
    }

    #[tokio::test(start_paused = true)]
    async fn ends_on_first_failed_send() {
        let metrics = metrics();
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let (_cancel_tx, cancel_rx) = watch::channel(false);
        let session = SubscriptionSession::new(
            tx,
            Duration::from_millis(10),
            3,
            cancel_rx,
            Arc::clone(&metrics),
        );

        timeout(Duration::from_secs(1), tokio::spawn(session.run()))
            .await
            .expect("prompt exit")
            .expect("no panic");
        assert_eq!(metrics.send_failures_total.get(), 1);
        assert_eq!(metrics.active_sessions.get(), 0);
    }
}
