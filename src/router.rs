use crate::events::{ClientEvent, EventBus};
use crate::protocol::{ClientMessage, Frame, FrameKind};
use crate::subscription::SubscriptionRegistry;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{debug, error, warn};

/// Dispatches inbound frames, push or polled, to listeners and handlers.
#[derive(Clone)]
pub struct MessageRouter {
    registry: SubscriptionRegistry,
    events: EventBus,
}

impl MessageRouter {
    pub fn new(registry: SubscriptionRegistry, events: EventBus) -> Self {
        Self { registry, events }
    }

    /// Route one frame. Returns a reply the caller must send, if any.
    pub fn route(&self, frame: Frame) -> Option<ClientMessage> {
        let kind = frame.kind();
        if kind == FrameKind::Ping {
            debug!("Ping received, replying with pong");
            return Some(ClientMessage::Pong);
        }

        if self.events.listener_count() > 0 {
            self.events.emit(ClientEvent::Message(frame.clone()));
        }

        if let Some(id) = frame.id.as_deref() {
            match self.registry.get(id) {
                Some(subscription) => {
                    let delivered =
                        catch_unwind(AssertUnwindSafe(|| subscription.deliver(&frame)));
                    if delivered.is_err() {
                        error!(
                            subscription_id = %id,
                            frame_type = %frame.frame_type,
                            "Subscription handler panicked"
                        );
                    }
                }
                None => {
                    // Unsubscribed while the frame was in flight
                    debug!(subscription_id = %id, "Dropping frame for inactive subscription");
                }
            }
        }

        match kind {
            FrameKind::SubscriptionConfirmed => {
                debug!(subscription_id = ?frame.id, "Subscription confirmed");
                self.events.emit(ClientEvent::SubscriptionConfirmed(frame));
            }
            FrameKind::SubscriptionError => {
                warn!(subscription_id = ?frame.id, data = %frame.data, "Subscription rejected");
                self.events.emit(ClientEvent::SubscriptionError(frame));
            }
            FrameKind::Ping | FrameKind::Application(_) => {}
        }

        None
    }
}
