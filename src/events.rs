use crate::protocol::Frame;
use std::time::Duration;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Status and traffic notifications published by the client.
///
/// UI code listens here to drive connection indicators; it never touches
/// the transport, retry timer or poller directly.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    Connected { connection_id: Uuid },
    /// Transport dropped (`code` from the close frame when known) or the
    /// client was disconnected manually
    Disconnected { code: Option<u16> },
    Reconnecting { attempt: u32, delay: Duration },
    /// Retries exhausted; nothing further happens until `connect()`
    ReconnectFailed { attempts: u32 },
    PollingStarted,
    PollingStopped,
    Error { message: String },
    /// Every non-ping frame, push or polled
    Message(Frame),
    SubscriptionConfirmed(Frame),
    SubscriptionError(Frame),
}

/// Fan-out of [`ClientEvent`]s to any number of listeners
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ClientEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.tx.subscribe()
    }

    /// Publish to current listeners. Having none is fine.
    pub fn emit(&self, event: ClientEvent) {
        let _ = self.tx.send(event);
    }

    pub fn listener_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
