use super::RealtimeConfig;

impl RealtimeConfig {
    /// Build from env vars, falling back to defaults.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Apply `PULSE_*` overrides on top of an existing config.
    ///
    /// Values that fail to parse are ignored.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("PULSE_WS_URL") {
            self.ws_url = v;
        }
        if let Some(v) = lookup("PULSE_HTTP_URL") {
            self.http_base_url = v;
        }
        if let Some(v) = lookup("PULSE_RECONNECT_ATTEMPTS") {
            if let Ok(n) = v.parse::<u32>() {
                self.reconnect_attempts = n;
            }
        }
        if let Some(v) = lookup("PULSE_RECONNECT_DELAY_MS") {
            if let Ok(n) = v.parse::<u64>() {
                self.reconnect_delay_ms = n;
            }
        }
        if let Some(v) = lookup("PULSE_POLLING_INTERVAL_MS") {
            if let Ok(n) = v.parse::<u64>() {
                self.polling_interval_ms = n;
            }
        }
        if let Some(v) = lookup("PULSE_ENABLE_POLLING") {
            if let Ok(b) = v.parse::<bool>() {
                self.enable_polling = b;
            }
        }
        if let Some(v) = lookup("PULSE_HANDSHAKE_TIMEOUT_MS") {
            if let Ok(n) = v.parse::<u64>() {
                self.handshake_timeout_ms = n;
            }
        }
        if let Some(v) = lookup("PULSE_EVENT_CAPACITY") {
            if let Ok(n) = v.parse::<usize>() {
                self.event_capacity = n;
            }
        }

        self
    }
}
