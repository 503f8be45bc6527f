//! Core traits for Prahari components
//!
//! The only seam between the socket side and the aggregation side is
//! `HitSink`: accept loops hand every hit to a sink and move on. Delivery
//! must be enqueue-and-return — an implementation must never make an accept
//! loop wait on a threshold decision.

use crate::types::Hit;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Destination for accepted-connection hits.
#[async_trait]
pub trait HitSink: Send + Sync + 'static {
    /// Deliver one hit. Must not block on downstream aggregation.
    async fn deliver(&self, hit: Hit);
}

/// `HitSink` backed by an unbounded channel; the send never waits, which is
/// what keeps accept loops decoupled from the aggregation task.
#[derive(Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Hit>,
}

impl ChannelSink {
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Hit>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl HitSink for ChannelSink {
    async fn deliver(&self, hit: Hit) {
        // Receiver gone means the detector is shutting down; dropping the
        // hit is correct then.
        let _ = self.tx.send(hit);
    }
}
