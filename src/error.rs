use std::fmt;
use std::time::Duration;

/// Socket-level failure opening or using the push transport
#[derive(Debug, Clone, PartialEq)]
pub enum TransportError {
    /// Handshake rejected or the endpoint was unreachable
    Connect(String),
    /// Handshake did not complete in time
    Timeout(Duration),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Connect(reason) => write!(f, "transport connect failed: {}", reason),
            TransportError::Timeout(after) => {
                write!(f, "transport handshake timed out after {:?}", after)
            }
        }
    }
}

impl std::error::Error for TransportError {}

/// Inbound frame that could not be understood. The frame is dropped.
#[derive(Debug)]
pub enum ProtocolError {
    Malformed(serde_json::Error),
    /// Valid JSON without a string `type` field
    MissingType,
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::Malformed(e) => write!(f, "malformed frame: {}", e),
            ProtocolError::MissingType => write!(f, "frame has no type"),
        }
    }
}

impl std::error::Error for ProtocolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProtocolError::Malformed(e) => Some(e),
            ProtocolError::MissingType => None,
        }
    }
}

impl From<serde_json::Error> for ProtocolError {
    fn from(e: serde_json::Error) -> Self {
        ProtocolError::Malformed(e)
    }
}

/// A single polling request failed. Only that channel misses this tick.
#[derive(Debug)]
pub enum FallbackRequestError {
    Request(reqwest::Error),
    /// Non-2xx response
    Status(u16),
    Decode(String),
}

impl fmt::Display for FallbackRequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackRequestError::Request(e) => write!(f, "poll request failed: {}", e),
            FallbackRequestError::Status(code) => write!(f, "poll returned status {}", code),
            FallbackRequestError::Decode(reason) => {
                write!(f, "poll response not valid JSON: {}", reason)
            }
        }
    }
}

impl std::error::Error for FallbackRequestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FallbackRequestError::Request(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for FallbackRequestError {
    fn from(e: reqwest::Error) -> Self {
        FallbackRequestError::Request(e)
    }
}

/// Error returned by [`crate::RealtimeClient::connect`].
///
/// Only the caller's own attempt is reported here; retries scheduled
/// afterwards report through the event stream.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectError {
    Transport(TransportError),
    /// `disconnect()` or a newer `connect()` superseded this attempt
    Cancelled,
}

impl fmt::Display for ConnectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectError::Transport(e) => write!(f, "{}", e),
            ConnectError::Cancelled => write!(f, "connect attempt cancelled"),
        }
    }
}

impl std::error::Error for ConnectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConnectError::Transport(e) => Some(e),
            ConnectError::Cancelled => None,
        }
    }
}

impl From<TransportError> for ConnectError {
    fn from(e: TransportError) -> Self {
        ConnectError::Transport(e)
    }
}
