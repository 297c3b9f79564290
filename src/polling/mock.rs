use super::PollSource;
use crate::error::FallbackRequestError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct MockPollState {
    responses: HashMap<String, Result<Value, u16>>,
    calls: HashMap<String, usize>,
}

/// Poll source answering from a per-channel table and counting calls
#[derive(Default)]
pub(crate) struct MockPollSource {
    state: Mutex<MockPollState>,
}

impl MockPollSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, channel: &str, body: Value) {
        self.state
            .lock()
            .unwrap()
            .responses
            .insert(channel.to_string(), Ok(body));
    }

    pub fn fail(&self, channel: &str, status: u16) {
        self.state
            .lock()
            .unwrap()
            .responses
            .insert(channel.to_string(), Err(status));
    }

    pub fn calls(&self, channel: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .get(channel)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.state.lock().unwrap().calls.values().sum()
    }
}

#[async_trait]
impl PollSource for MockPollSource {
    async fn fetch(&self, channel: &str) -> Result<Value, FallbackRequestError> {
        let mut state = self.state.lock().unwrap();
        *state.calls.entry(channel.to_string()).or_insert(0) += 1;
        match state.responses.get(channel) {
            Some(Ok(body)) => Ok(body.clone()),
            Some(Err(status)) => Err(FallbackRequestError::Status(*status)),
            None => Ok(Value::Null),
        }
    }
}
