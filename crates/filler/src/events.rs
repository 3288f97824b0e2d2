//! The filler's outward-facing event stream.
//!
//! A single bounded broadcast channel carries everything: the monitor
//! publishes `NewOrder`, the scheduler consumes it and publishes
//! `OrderDetected` (watch-only destinations) and `OrderFilled`. Embedding
//! hosts subscribe for whatever surface they want to build on top.

use {
    crate::domain::{Order, eth::B256, eth::ExecutionId},
    std::sync::Arc,
    tokio::sync::broadcast,
};

/// Bounded so a slow subscriber lags (and is told so) instead of growing an
/// unbounded backlog.
const CHANNEL_CAPACITY: usize = 256;

#[derive(Clone, Debug)]
pub enum FillerEvent {
    /// A complete order was reconstructed from chain events.
    NewOrder(Arc<Order>),
    /// An order targeting a watch-only destination was observed.
    OrderDetected(Arc<Order>),
    /// An execution for the order succeeded.
    OrderFilled {
        commitment: B256,
        transaction: ExecutionId,
    },
}

#[derive(Clone, Debug)]
pub struct Events(broadcast::Sender<FillerEvent>);

impl Events {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self(sender)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FillerEvent> {
        self.0.subscribe()
    }

    /// Send failures only mean nobody is subscribed, which is fine.
    pub fn publish(&self, event: FillerEvent) {
        let _ = self.0.send(event);
    }
}

impl Default for Events {
    fn default() -> Self {
        Self::new()
    }
}
