use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::event::OutcomeReport;
use crate::traits::OutcomeSink;

/// Default channel buffer size for outcome delivery.
const DEFAULT_BUFFER_SIZE: usize = 256;

/// Bounded channel carrying outcome reports from the coordinator to the
/// notification layer.
pub struct OutcomeBus {
    pub tx: mpsc::Sender<OutcomeReport>,
    pub rx: Option<mpsc::Receiver<OutcomeReport>>,
}

impl OutcomeBus {
    pub fn new() -> Self {
        Self::with_buffer_size(DEFAULT_BUFFER_SIZE)
    }

    pub fn with_buffer_size(buffer: usize) -> Self {
        let (tx, rx) = mpsc::channel(buffer);
        info!(buffer_size = buffer, "OutcomeBus initialized");
        Self { tx, rx: Some(rx) }
    }

    /// A sink that publishes onto this bus.
    pub fn sink(&self) -> ChannelSink {
        ChannelSink { tx: self.tx.clone() }
    }

    /// Take the receiver (can only be called once).
    pub fn take_rx(&mut self) -> Option<mpsc::Receiver<OutcomeReport>> {
        debug!("Outcome receiver taken");
        self.rx.take()
    }
}

impl Default for OutcomeBus {
    fn default() -> Self {
        Self::new()
    }
}

/// `OutcomeSink` backed by an mpsc sender. Applies backpressure when the
/// consumer lags.
#[derive(Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<OutcomeReport>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<OutcomeReport>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl OutcomeSink for ChannelSink {
    async fn deliver(&self, report: OutcomeReport) {
        let requester = report.requester;
        if self.tx.send(report).await.is_err() {
            warn!(%requester, "Outcome receiver dropped; report discarded");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::VerificationOutcome;
    use crate::types::RequesterId;

    #[tokio::test]
    async fn test_bus_send_receive() {
        let mut bus = OutcomeBus::new();
        let mut rx = bus.take_rx().unwrap();

        bus.sink()
            .deliver(OutcomeReport::new(RequesterId(7), None, VerificationOutcome::PendingNotFound))
            .await;
        let received = rx.recv().await.unwrap();
        assert_eq!(received.requester, RequesterId(7));
        assert_eq!(received.outcome, VerificationOutcome::PendingNotFound);
    }

    #[tokio::test]
    async fn test_bus_take_rx_once() {
        let mut bus = OutcomeBus::new();
        assert!(bus.take_rx().is_some());
        assert!(bus.take_rx().is_none());
    }

    #[tokio::test]
    async fn test_bus_backpressure() {
        let bus = OutcomeBus::with_buffer_size(1);
        bus.tx
            .send(OutcomeReport::new(RequesterId(1), None, VerificationOutcome::CodeMismatch))
            .await
            .unwrap();
        let result = bus
            .tx
            .try_send(OutcomeReport::new(RequesterId(2), None, VerificationOutcome::CodeMismatch));
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn deliver_after_receiver_dropped_does_not_panic() {
        let mut bus = OutcomeBus::new();
        drop(bus.take_rx());
        bus.sink()
            .deliver(OutcomeReport::new(RequesterId(3), None, VerificationOutcome::CodeMismatch))
            .await;
    }
}
