use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

/// Connection lifecycle state.
///
/// ```text
/// disconnected --connect()--> connecting --ok--> connected
/// connecting --fail--> reconnecting      connected --drop--> reconnecting
/// reconnecting --retry ok--> connected   reconnecting --exhausted--> disconnected
/// any --disconnect()--> disconnected
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Reconnecting => "reconnecting",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of the client's connection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionSnapshot {
    /// Fixed for the lifetime of the client
    pub id: Uuid,
    pub status: ConnectionStatus,
    /// Reconnect attempts since the last successful connect
    pub attempt: u32,
    /// Polling fallback currently running
    pub polling: bool,
    pub subscriptions: usize,
    pub last_connected_at: Option<DateTime<Utc>>,
}
