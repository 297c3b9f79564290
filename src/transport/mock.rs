//! Scripted in-memory transport for exercising the client state machine.

use super::{Outbound, TransportEvent, TransportLink, TransportPeer, TransportProvider};
use crate::error::TransportError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct MockState {
    /// Handshake outcomes consumed in order; empty means succeed
    outcomes: VecDeque<Result<(), TransportError>>,
    handshake_delay: Duration,
    opens: usize,
    servers: VecDeque<MockServer>,
}

#[derive(Clone, Default)]
pub(crate) struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_next(&self, count: usize) {
        let mut state = self.state.lock().unwrap();
        for _ in 0..count {
            state
                .outcomes
                .push_back(Err(TransportError::Connect("refused".to_string())));
        }
    }

    pub fn set_handshake_delay(&self, delay: Duration) {
        self.state.lock().unwrap().handshake_delay = delay;
    }

    pub fn open_count(&self) -> usize {
        self.state.lock().unwrap().opens
    }

    /// Server side of the oldest connection not yet taken
    pub fn take_server(&self) -> MockServer {
        self.state
            .lock()
            .unwrap()
            .servers
            .pop_front()
            .expect("no connection was opened")
    }
}

#[async_trait]
impl TransportProvider for MockTransport {
    async fn open(&self, _url: &str) -> Result<TransportLink, TransportError> {
        let (outcome, delay) = {
            let mut state = self.state.lock().unwrap();
            state.opens += 1;
            (state.outcomes.pop_front().unwrap_or(Ok(())), state.handshake_delay)
        };

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        outcome?;

        let (link, peer) = TransportLink::pair();
        self.state
            .lock()
            .unwrap()
            .servers
            .push_back(MockServer { peer });
        Ok(link)
    }
}

/// Test-side handle on one open connection
pub(crate) struct MockServer {
    peer: TransportPeer,
}

impl MockServer {
    /// Drain every JSON frame the client has written so far.
    pub fn sent(&mut self) -> Vec<Value> {
        let mut frames = Vec::new();
        while let Ok(outbound) = self.peer.outbound.try_recv() {
            if let Outbound::Text(text) = outbound {
                frames.push(serde_json::from_str(&text).expect("client sent invalid JSON"));
            }
        }
        frames
    }

    /// True once the client has asked to close this connection
    pub fn close_requested(&mut self) -> bool {
        let mut closed = false;
        while let Ok(outbound) = self.peer.outbound.try_recv() {
            if outbound == Outbound::Close {
                closed = true;
            }
        }
        closed
    }

    pub fn push(&self, frame: Value) {
        let _ = self
            .peer
            .inbound
            .send(TransportEvent::Frame(frame.to_string()));
    }

    pub fn push_raw(&self, text: &str) {
        let _ = self.peer.inbound.send(TransportEvent::Frame(text.to_string()));
    }

    pub fn drop_connection(&self, code: Option<u16>) {
        let _ = self.peer.inbound.send(TransportEvent::Closed { code });
    }
}
