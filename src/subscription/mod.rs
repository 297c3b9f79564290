// Subscription registry: channel interest per consumer, replayed on reconnect

pub mod registry;

pub use registry::{Handler, Subscription, SubscriptionRegistry};
