// Bearer tokens for the polling fallback
pub mod auth;

// Connection state machine and public client surface
pub mod client;

// Configuration loading (TOML + env overrides)
pub mod config;

pub mod error;

// Status and traffic notifications
pub mod events;

// HTTP polling fallback
pub mod polling;

// Wire frames
pub mod protocol;

pub mod reconnect;

// Inbound frame dispatch
pub mod router;

// Subscription registry
pub mod subscription;

// Push transport (WebSocket)
pub mod transport;

pub use auth::{EnvToken, StaticToken, TokenProvider};
pub use client::{ConnectionSnapshot, ConnectionStatus, RealtimeClient};
pub use config::{MonitorConfig, RealtimeConfig};
pub use error::{ConnectError, FallbackRequestError, ProtocolError, TransportError};
pub use events::ClientEvent;
pub use protocol::{ClientMessage, Frame};
