use tokio::sync::broadcast;

use crate::types::ServerEvent;

const CHANNEL_CAPACITY: usize = 1024;

/// Fan-out of state-change events to every connected observer. Sends are
/// fire-and-forget: with no observers, or with one that lagged out of the
/// buffer, the mutation that produced the event is unaffected.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ServerEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn send(&self, event: ServerEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.tx.subscribe()
    }

    pub fn observer_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
