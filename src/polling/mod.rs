//! Degraded delivery while the push transport is down.
//!
//! On each tick every active subscription's channel is fetched once over
//! request/response, and each result is routed as a `poll_update` frame
//! through the same path push frames take.

pub mod http;

#[cfg(test)]
pub(crate) mod mock;

use crate::error::FallbackRequestError;
use crate::protocol::Frame;
use crate::router::MessageRouter;
use crate::subscription::Subscription;
use async_trait::async_trait;
use futures::future::join_all;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

pub use http::HttpPollSource;

/// Bounds on the polling period; the ticker cannot run on a zero period and
/// deadlines must stay representable
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);
pub const MAX_POLL_INTERVAL: Duration = Duration::from_secs(86_400);

/// Fetches the current state of one channel
#[async_trait]
pub trait PollSource: Send + Sync {
    async fn fetch(&self, channel: &str) -> Result<Value, FallbackRequestError>;
}

/// What the poll loop should do on a tick
pub enum PollTick {
    /// Owner is gone; end the loop
    Stop,
    /// Not allowed to deliver right now (e.g. a handshake is in flight)
    Skip,
    Poll(Vec<Arc<Subscription>>),
}

/// Outcome of one polling round
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PollSummary {
    pub delivered: usize,
    pub failed: usize,
}

pub struct PollingFallback {
    source: Arc<dyn PollSource>,
    router: MessageRouter,
    period: Duration,
}

impl PollingFallback {
    /// `period` is clamped to [`MIN_POLL_INTERVAL`, `MAX_POLL_INTERVAL`].
    pub fn new(source: Arc<dyn PollSource>, router: MessageRouter, period: Duration) -> Self {
        Self {
            source,
            router,
            period: period.clamp(MIN_POLL_INTERVAL, MAX_POLL_INTERVAL),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Poll every given subscription concurrently and route the results.
    ///
    /// A failed request only costs that subscription this round.
    pub async fn poll_once(&self, subscriptions: Vec<Arc<Subscription>>) -> PollSummary {
        let requests = subscriptions.iter().map(|sub| {
            let source = Arc::clone(&self.source);
            async move { (sub, source.fetch(&sub.channel).await) }
        });

        let mut summary = PollSummary::default();
        for (sub, result) in join_all(requests).await {
            match result {
                Ok(data) => {
                    debug!(
                        subscription_id = %sub.id,
                        channel = %sub.channel,
                        "Poll update received"
                    );
                    self.router.route(Frame::poll_update(&sub.id, data));
                    summary.delivered += 1;
                }
                Err(e) => {
                    warn!(
                        subscription_id = %sub.id,
                        channel = %sub.channel,
                        error = %e,
                        "Poll request failed"
                    );
                    summary.failed += 1;
                }
            }
        }
        summary
    }

    /// Poll on a fixed period until `next` says stop.
    ///
    /// The first round happens one full period after the call.
    pub async fn run<F>(self, mut next: F)
    where
        F: FnMut() -> PollTick + Send,
    {
        info!(interval_ms = self.period.as_millis() as u64, "Polling fallback running");

        let mut ticker = interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;

            match next() {
                PollTick::Stop => break,
                PollTick::Skip => {
                    debug!("Poll tick skipped");
                }
                PollTick::Poll(subscriptions) => {
                    if subscriptions.is_empty() {
                        continue;
                    }
                    let summary = self.poll_once(subscriptions).await;
                    debug!(
                        delivered = summary.delivered,
                        failed = summary.failed,
                        "Poll round complete"
                    );
                }
            }
        }

        debug!("Polling fallback loop ended");
    }
}
