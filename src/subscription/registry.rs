use crate::protocol::{ClientMessage, Frame};
use dashmap::DashMap;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Consumer callback for frames addressed to one subscription
pub type Handler = Arc<dyn Fn(&Frame) + Send + Sync>;

/// One consumer's interest in a channel
pub struct Subscription {
    pub id: String,
    pub channel: String,
    handler: Handler,
    active: AtomicBool,
}

impl Subscription {
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Run the handler unless the subscription was removed meanwhile.
    ///
    /// Returns whether the handler ran.
    pub fn deliver(&self, frame: &Frame) -> bool {
        if !self.is_active() {
            return false;
        }
        (self.handler)(frame);
        true
    }

    pub fn subscribe_message(&self) -> ClientMessage {
        ClientMessage::Subscribe {
            channel: self.channel.clone(),
            subscription_id: self.id.clone(),
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("channel", &self.channel)
            .field("active", &self.is_active())
            .finish()
    }
}

/// Active subscriptions keyed by id.
///
/// Clones share the same map. Entries survive transport churn; ids are
/// assigned once and reused for every replay.
#[derive(Clone, Default)]
pub struct SubscriptionRegistry {
    entries: Arc<DashMap<String, Arc<Subscription>>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a new subscription and return it
    pub fn insert(&self, channel: &str, handler: Handler) -> Arc<Subscription> {
        let subscription = Arc::new(Subscription {
            id: Uuid::now_v7().to_string(),
            channel: channel.to_string(),
            handler,
            active: AtomicBool::new(true),
        });
        self.entries
            .insert(subscription.id.clone(), Arc::clone(&subscription));
        subscription
    }

    /// Deactivate and drop an entry. Returns it if it existed.
    pub fn remove(&self, id: &str) -> Option<Arc<Subscription>> {
        let (_, subscription) = self.entries.remove(id)?;
        subscription.active.store(false, Ordering::Release);
        Some(subscription)
    }

    pub fn get(&self, id: &str) -> Option<Arc<Subscription>> {
        self.entries
            .get(id)
            .map(|entry| Arc::clone(entry.value()))
            .filter(|s| s.is_active())
    }

    /// All active subscriptions, in no particular order
    pub fn snapshot(&self) -> Vec<Arc<Subscription>> {
        self.entries
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .filter(|s| s.is_active())
            .collect()
    }

    /// Distinct channels with at least one active subscription
    pub fn channels(&self) -> BTreeSet<String> {
        self.entries
            .iter()
            .filter(|entry| entry.value().is_active())
            .map(|entry| entry.value().channel.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
