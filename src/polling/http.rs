use super::PollSource;
use crate::auth::{bearer_header, TokenProvider};
use crate::error::FallbackRequestError;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Polls `GET {base_url}/api/realtime/{channel}` with a bearer token
pub struct HttpPollSource {
    http_client: reqwest::Client,
    base_url: String,
    tokens: Arc<dyn TokenProvider>,
}

impl HttpPollSource {
    pub fn new(base_url: impl Into<String>, tokens: Arc<dyn TokenProvider>) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            base_url: base_url.into(),
            tokens,
        }
    }

    /// Endpoint for a channel; the channel is encoded as one path segment
    pub fn channel_url(&self, channel: &str) -> String {
        format!(
            "{}/api/realtime/{}",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(channel)
        )
    }
}

#[async_trait]
impl PollSource for HttpPollSource {
    async fn fetch(&self, channel: &str) -> Result<Value, FallbackRequestError> {
        let url = self.channel_url(channel);
        debug!(url = %url, "Polling channel");

        let mut request = self.http_client.get(&url).header(ACCEPT, "application/json");
        if let Some(header) = bearer_header(self.tokens.as_ref()) {
            request = request.header(AUTHORIZATION, header);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FallbackRequestError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| FallbackRequestError::Decode(e.to_string()))
    }
}
