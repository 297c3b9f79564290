pub mod env;

use crate::polling::{MAX_POLL_INTERVAL, MIN_POLL_INTERVAL};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

/// Connection, reconnect and polling settings for one client instance.
///
/// Immutable once handed to [`crate::RealtimeClient`].
#[derive(Debug, Clone, Deserialize)]
pub struct RealtimeConfig {
    /// Push transport endpoint
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
    /// Base URL for the polling fallback (`GET {base}/api/realtime/{channel}`)
    #[serde(default = "default_http_base_url")]
    pub http_base_url: String,
    /// Retries after a transport failure before giving up
    #[serde(default = "default_reconnect_attempts")]
    pub reconnect_attempts: u32,
    /// Base retry delay; attempt `n` waits `n * reconnect_delay_ms`
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    /// Polling fallback period
    #[serde(default = "default_polling_interval_ms")]
    pub polling_interval_ms: u64,
    #[serde(default = "default_enable_polling")]
    pub enable_polling: bool,
    /// Upper bound on one handshake before it counts as a failed connect
    #[serde(default = "default_handshake_timeout_ms")]
    pub handshake_timeout_ms: u64,
    /// Depth of the client event stream
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_ws_url() -> String {
    "ws://localhost:3000/api/ws".to_string()
}

fn default_http_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_reconnect_attempts() -> u32 {
    5
}

fn default_reconnect_delay_ms() -> u64 {
    1000
}

fn default_polling_interval_ms() -> u64 {
    2000
}

fn default_enable_polling() -> bool {
    true
}

fn default_handshake_timeout_ms() -> u64 {
    10_000
}

fn default_event_capacity() -> usize {
    256
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            ws_url: default_ws_url(),
            http_base_url: default_http_base_url(),
            reconnect_attempts: default_reconnect_attempts(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            polling_interval_ms: default_polling_interval_ms(),
            enable_polling: default_enable_polling(),
            handshake_timeout_ms: default_handshake_timeout_ms(),
            event_capacity: default_event_capacity(),
        }
    }
}

impl RealtimeConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// Polling period, clamped to what the poll loop can run on
    pub fn polling_interval(&self) -> Duration {
        Duration::from_millis(self.polling_interval_ms).clamp(MIN_POLL_INTERVAL, MAX_POLL_INTERVAL)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }
}

/// Configuration for the `pulse-monitor` binary
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    #[serde(default)]
    pub realtime: RealtimeConfig,
    /// Channels subscribed on startup
    #[serde(default = "default_channels")]
    pub channels: Vec<String>,
    /// Environment variable holding the bearer token for polling requests
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

fn default_channels() -> Vec<String> {
    vec!["dashboard".to_string()]
}

fn default_token_env() -> String {
    "PULSE_TOKEN".to_string()
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            realtime: RealtimeConfig::default(),
            channels: default_channels(),
            token_env: default_token_env(),
        }
    }
}

/// Load configuration from TOML file
pub fn load_config(path: &str) -> Result<MonitorConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path))?;
    let config: MonitorConfig =
        toml::from_str(&contents).with_context(|| format!("Failed to parse {}", path))?;
    Ok(config)
}
