use crate::error::ProtocolError;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Frame type synthesized by the polling fallback
pub const POLL_UPDATE: &str = "poll_update";

/// One JSON message unit, either received over the transport or
/// synthesized by the polling fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    #[serde(rename = "type")]
    pub frame_type: String,
    #[serde(default)]
    pub data: Value,
    /// Milliseconds since the Unix epoch
    #[serde(default = "now_millis")]
    pub timestamp: i64,
    /// Subscription this frame is addressed to; absent for broadcast/system frames
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

impl Frame {
    pub fn new(frame_type: impl Into<String>, data: Value) -> Self {
        Self {
            frame_type: frame_type.into(),
            data,
            timestamp: now_millis(),
            id: None,
        }
    }

    /// Address this frame to a subscription
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Frame carrying one polling response for a subscription
    pub fn poll_update(subscription_id: &str, data: Value) -> Self {
        Self::new(POLL_UPDATE, data).with_id(subscription_id)
    }

    /// Parse a text frame from the wire.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_str(text)?;
        if !value.get("type").map(Value::is_string).unwrap_or(false) {
            return Err(ProtocolError::MissingType);
        }
        Ok(serde_json::from_value(value)?)
    }

    pub fn kind(&self) -> FrameKind<'_> {
        match self.frame_type.as_str() {
            "ping" => FrameKind::Ping,
            "subscription_confirmed" => FrameKind::SubscriptionConfirmed,
            "subscription_error" => FrameKind::SubscriptionError,
            other => FrameKind::Application(other),
        }
    }
}

/// Classification of an inbound frame by its `type`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind<'a> {
    /// Server keepalive; answered with a pong and not dispatched further
    Ping,
    SubscriptionConfirmed,
    SubscriptionError,
    /// Anything else is a payload routed by subscription id
    Application(&'a str),
}

/// Client → Server control frames
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "subscribe")]
    Subscribe {
        channel: String,
        #[serde(rename = "subscriptionId")]
        subscription_id: String,
    },
    #[serde(rename = "unsubscribe")]
    Unsubscribe {
        #[serde(rename = "subscriptionId")]
        subscription_id: String,
    },
    #[serde(rename = "pong")]
    Pong,
}

impl ClientMessage {
    pub fn to_json(&self) -> String {
        // Serializing a fieldset of plain strings cannot fail
        serde_json::to_string(self).unwrap_or_default()
    }
}
