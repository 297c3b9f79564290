//! Push transport abstraction.
//!
//! A [`TransportProvider`] opens one duplex connection and hands back a
//! [`TransportLink`]: an outbound queue the client writes text frames into
//! and an inbound queue of [`TransportEvent`]s the client's reader drains.
//! Providers interpret nothing; frames are passed through as raw text.

pub mod websocket;

#[cfg(test)]
pub(crate) mod mock;

use crate::error::TransportError;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

pub use websocket::WebSocketProvider;

/// Opens push connections. Injected into the client so the state machine
/// can run against a scripted transport in tests.
#[async_trait]
pub trait TransportProvider: Send + Sync {
    /// Resolves once the handshake completes, fails on immediate rejection.
    async fn open(&self, url: &str) -> Result<TransportLink, TransportError>;
}

/// Client → transport
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Text(String),
    Close,
}

/// Transport → client
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Frame(String),
    Error(String),
    /// Terminal; nothing follows on this link
    Closed { code: Option<u16> },
}

/// Client half of an open connection
pub struct TransportLink {
    sender: LinkSender,
    inbound: mpsc::UnboundedReceiver<TransportEvent>,
}

/// Provider half of an open connection
pub struct TransportPeer {
    pub outbound: mpsc::UnboundedReceiver<Outbound>,
    pub inbound: mpsc::UnboundedSender<TransportEvent>,
}

impl TransportLink {
    /// Create a connected link/peer pair for a provider to drive.
    pub fn pair() -> (TransportLink, TransportPeer) {
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let link = TransportLink {
            sender: LinkSender {
                tx: out_tx,
                closed: Arc::new(AtomicBool::new(false)),
            },
            inbound: in_rx,
        };
        let peer = TransportPeer {
            outbound: out_rx,
            inbound: in_tx,
        };
        (link, peer)
    }

    pub fn split(self) -> (LinkSender, mpsc::UnboundedReceiver<TransportEvent>) {
        (self.sender, self.inbound)
    }
}

/// Write side of a link; cheap to clone
#[derive(Clone)]
pub struct LinkSender {
    tx: mpsc::UnboundedSender<Outbound>,
    closed: Arc<AtomicBool>,
}

impl LinkSender {
    /// Queue a text frame. Returns false if the link is closed or gone.
    pub fn send(&self, text: String) -> bool {
        if self.closed.load(Ordering::Acquire) {
            return false;
        }
        self.tx.send(Outbound::Text(text)).is_ok()
    }

    /// Ask the provider to close the connection. Idempotent.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            let _ = self.tx.send(Outbound::Close);
        }
    }

    pub fn is_open(&self) -> bool {
        !self.closed.load(Ordering::Acquire) && !self.tx.is_closed()
    }
}
