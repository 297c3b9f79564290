//! Realtime client: the only surface application code touches.
//!
//! One [`RealtimeClient`] owns one logical connection. Subscriptions are
//! multiplexed over it, replayed after every (re)connect, and fed by the
//! polling fallback while the push transport is down.
//!
//! All connection state lives behind a single mutex that is never held
//! across an `.await` and never held while a subscription handler runs.
//! Background work (reader, retry timer, poll loop) runs as spawned tasks
//! whose handles are stored here and aborted on teardown. Each `connect()`
//! and `disconnect()` bumps an epoch; tasks carry the epoch they were
//! started under and back off if it no longer matches.

mod status;


pub use status::{ConnectionSnapshot, ConnectionStatus};

use crate::auth::TokenProvider;
use crate::config::RealtimeConfig;
use crate::error::{ConnectError, TransportError};
use crate::events::{ClientEvent, EventBus};
use crate::polling::{HttpPollSource, PollSource, PollTick, PollingFallback};
use crate::protocol::{ClientMessage, Frame};
use crate::reconnect::ReconnectPolicy;
use crate::router::MessageRouter;
use crate::subscription::SubscriptionRegistry;
use crate::transport::{
    LinkSender, TransportEvent, TransportLink, TransportProvider, WebSocketProvider,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Close code reported for a caller-initiated disconnect
const NORMAL_CLOSURE: u16 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    /// `connect()` called by the application; failure is returned
    Caller,
    /// Fired by the reconnect timer; failure is event-only
    Retry,
}

struct ConnState {
    status: ConnectionStatus,
    epoch: u64,
    /// Bumped for every established link so a stale reader cannot tear
    /// down its successor
    link_seq: u64,
    handshake_in_flight: bool,
    policy: ReconnectPolicy,
    link: Option<LinkSender>,
    reader: Option<JoinHandle<()>>,
    reconnect_timer: Option<JoinHandle<()>>,
    polling: Option<JoinHandle<()>>,
    last_connected_at: Option<DateTime<Utc>>,
}

impl ConnState {
    fn cancel_reconnect(&mut self) {
        if let Some(timer) = self.reconnect_timer.take() {
            timer.abort();
        }
    }

    /// Returns whether polling was running
    fn stop_polling(&mut self) -> bool {
        match self.polling.take() {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    fn polling_active(&self) -> bool {
        self.polling
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Write a control frame if the link is up. Never fails.
    fn send_message(&self, message: &ClientMessage) -> bool {
        self.send_text(message.to_json())
    }

    fn send_text(&self, text: String) -> bool {
        match (&self.status, &self.link) {
            (ConnectionStatus::Connected, Some(link)) if link.is_open() => link.send(text),
            _ => false,
        }
    }
}

struct Shared {
    config: RealtimeConfig,
    connection_id: Uuid,
    transport: Arc<dyn TransportProvider>,
    poll_source: Option<Arc<dyn PollSource>>,
    registry: SubscriptionRegistry,
    router: MessageRouter,
    events: EventBus,
    state: Mutex<ConnState>,
}

impl Shared {
    fn lock_state(&self) -> MutexGuard<'_, ConnState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open a transport and adopt it, or hand the failure to the
    /// reconnect policy.
    async fn establish(
        shared: &Arc<Shared>,
        epoch: u64,
        origin: Attempt,
    ) -> Result<(), ConnectError> {
        let handshake_timeout = shared.config.handshake_timeout();
        let opened = match timeout(handshake_timeout, shared.transport.open(&shared.config.ws_url))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout(handshake_timeout)),
        };

        match opened {
            Ok(link) => Shared::adopt_link(shared, epoch, link),
            Err(e) => {
                warn!(
                    url = %shared.config.ws_url,
                    origin = ?origin,
                    error = %e,
                    "Connect attempt failed"
                );
                let current = Shared::on_transport_lost(shared, epoch, None, None, Some(&e));
                match origin {
                    Attempt::Caller if current => Err(ConnectError::Transport(e)),
                    Attempt::Caller => Err(ConnectError::Cancelled),
                    Attempt::Retry => Ok(()),
                }
            }
        }
    }

    /// Handshake succeeded: go live, stop polling, replay subscriptions.
    fn adopt_link(
        shared: &Arc<Shared>,
        epoch: u64,
        link: TransportLink,
    ) -> Result<(), ConnectError> {
        let (sender, inbound) = link.split();
        let mut state = shared.lock_state();

        if state.epoch != epoch {
            debug!("Discarding connection from superseded attempt");
            sender.close();
            return Err(ConnectError::Cancelled);
        }

        state.cancel_reconnect();
        let polling_stopped = state.stop_polling();

        state.handshake_in_flight = false;
        state.status = ConnectionStatus::Connected;
        state.policy.reset();
        state.last_connected_at = Some(Utc::now());
        state.link_seq += 1;

        // Registry membership only changes under this lock, so the replay
        // set is exactly what is active right now
        let subscriptions = shared.registry.snapshot();
        for subscription in &subscriptions {
            sender.send(subscription.subscribe_message().to_json());
        }

        let link_seq = state.link_seq;
        state.link = Some(sender);
        let reader = Shared::spawn_reader(shared, epoch, link_seq, inbound);
        if let Some(previous) = state.reader.replace(reader) {
            previous.abort();
        }

        info!(
            connection_id = %shared.connection_id,
            replayed = subscriptions.len(),
            "Realtime connection established"
        );

        if polling_stopped {
            info!("Polling fallback stopped");
            shared.events.emit(ClientEvent::PollingStopped);
        }
        shared.events.emit(ClientEvent::Connected {
            connection_id: shared.connection_id,
        });

        Ok(())
    }

    /// Drain inbound transport events for one link.
    fn spawn_reader(
        shared: &Arc<Shared>,
        epoch: u64,
        link_seq: u64,
        mut inbound: mpsc::UnboundedReceiver<TransportEvent>,
    ) -> JoinHandle<()> {
        let weak = Arc::downgrade(shared);

        tokio::spawn(async move {
            let mut close_code = None;

            while let Some(event) = inbound.recv().await {
                let Some(shared) = weak.upgrade() else {
                    return;
                };
                match event {
                    TransportEvent::Frame(text) => shared.handle_text(epoch, &text),
                    TransportEvent::Error(message) => {
                        warn!(error = %message, "Transport error");
                        shared.events.emit(ClientEvent::Error { message });
                    }
                    TransportEvent::Closed { code } => {
                        close_code = code;
                        break;
                    }
                }
            }

            if let Some(shared) = weak.upgrade() {
                Shared::on_transport_lost(&shared, epoch, Some(link_seq), close_code, None);
            }
        })
    }

    fn handle_text(&self, epoch: u64, text: &str) {
        if self.lock_state().epoch != epoch {
            return;
        }

        let frame = match Frame::parse(text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "Dropping unparsable frame");
                return;
            }
        };

        debug!(frame_type = %frame.frame_type, subscription_id = ?frame.id, "Frame received");

        if let Some(reply) = self.router.route(frame) {
            let state = self.lock_state();
            if state.epoch == epoch && !state.send_message(&reply) {
                warn!("Transport not open, reply dropped");
            }
        }
    }

    /// Transport dropped or a handshake failed. Schedules the next retry
    /// (or gives up) and brings up the polling fallback.
    ///
    /// Returns false if the event belongs to a superseded attempt or link.
    fn on_transport_lost(
        shared: &Arc<Shared>,
        epoch: u64,
        link_seq: Option<u64>,
        code: Option<u16>,
        failure: Option<&TransportError>,
    ) -> bool {
        let mut state = shared.lock_state();

        if state.epoch != epoch {
            return false;
        }
        if let Some(seq) = link_seq {
            if seq != state.link_seq || state.link.is_none() {
                return false;
            }
        }

        let was_connected = state.status == ConnectionStatus::Connected;
        if let Some(link) = state.link.take() {
            link.close();
        }
        // The reader is the caller here, or there never was one
        state.reader = None;
        state.handshake_in_flight = false;

        if was_connected {
            warn!(code = ?code, "Realtime connection lost");
            shared.events.emit(ClientEvent::Disconnected { code });
        }
        if let Some(e) = failure {
            shared.events.emit(ClientEvent::Error {
                message: e.to_string(),
            });
        }

        state.cancel_reconnect();
        match state.policy.next_delay() {
            Some(delay) => {
                let attempt = state.policy.attempt();
                state.status = ConnectionStatus::Reconnecting;
                info!(
                    attempt = attempt,
                    max_attempts = state.policy.max_attempts(),
                    delay_ms = delay.as_millis() as u64,
                    "Scheduling reconnect"
                );
                shared
                    .events
                    .emit(ClientEvent::Reconnecting { attempt, delay });
                state.reconnect_timer = Some(Shared::spawn_retry(shared, epoch, delay));
            }
            None => {
                let attempts = state.policy.attempt();
                state.status = ConnectionStatus::Disconnected;
                warn!(attempts = attempts, "Reconnect attempts exhausted");
                shared.events.emit(ClientEvent::ReconnectFailed { attempts });
            }
        }

        Shared::start_polling(shared, &mut state);
        true
    }

    fn spawn_retry(shared: &Arc<Shared>, epoch: u64, delay: Duration) -> JoinHandle<()> {
        let weak = Arc::downgrade(shared);

        tokio::spawn(async move {
            sleep(delay).await;

            let Some(shared) = weak.upgrade() else {
                return;
            };
            {
                let mut state = shared.lock_state();
                if state.epoch != epoch {
                    return;
                }
                // Detach our own handle; nothing left to cancel
                state.reconnect_timer = None;
                state.handshake_in_flight = true;
            }

            debug!(url = %shared.config.ws_url, "Reconnect timer fired");
            let _ = Shared::establish(&shared, epoch, Attempt::Retry).await;
        })
    }

    /// Start the poll loop unless disabled, unavailable or already running.
    fn start_polling(shared: &Arc<Shared>, state: &mut ConnState) {
        if !shared.config.enable_polling || state.polling_active() {
            return;
        }
        let Some(source) = shared.poll_source.clone() else {
            return;
        };

        let fallback = PollingFallback::new(
            source,
            shared.router.clone(),
            shared.config.polling_interval(),
        );
        let interval_ms = fallback.period().as_millis() as u64;
        let weak: Weak<Shared> = Arc::downgrade(shared);
        state.polling = Some(tokio::spawn(fallback.run(move || match weak.upgrade() {
            Some(shared) => shared.poll_tick(),
            None => PollTick::Stop,
        })));

        info!(
            interval_ms = interval_ms,
            channels = ?shared.registry.channels(),
            "Polling fallback started"
        );
        shared.events.emit(ClientEvent::PollingStarted);
    }

    fn poll_tick(&self) -> PollTick {
        let state = self.lock_state();
        if state.status == ConnectionStatus::Connected {
            return PollTick::Stop;
        }
        // Never deliver polled data while a handshake could deliver pushed data
        if state.handshake_in_flight {
            return PollTick::Skip;
        }
        PollTick::Poll(self.registry.snapshot())
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        let state = self
            .state
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        state.cancel_reconnect();
        state.stop_polling();
        if let Some(reader) = state.reader.take() {
            reader.abort();
        }
        if let Some(link) = state.link.take() {
            link.close();
        }
    }
}

/// Realtime connection and subscription manager.
///
/// Cheap to clone; clones share one connection. Background tasks hold
/// weak references, so dropping every clone winds them down.
///
/// ```no_run
/// use pulse::{RealtimeClient, RealtimeConfig, StaticToken};
/// use std::sync::Arc;
///
/// # async fn run() -> Result<(), pulse::ConnectError> {
/// let client = RealtimeClient::from_config(
///     RealtimeConfig::default(),
///     Arc::new(StaticToken::new("token")),
/// );
/// let id = client.subscribe("dashboard", |frame| {
///     println!("{} {}", frame.frame_type, frame.data);
/// });
/// client.connect().await?;
/// client.unsubscribe(&id);
/// client.disconnect();
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RealtimeClient {
    shared: Arc<Shared>,
}

impl RealtimeClient {
    /// Build a client over an injected transport and optional poll source.
    ///
    /// Nothing is spawned until [`connect`](Self::connect).
    pub fn new(
        config: RealtimeConfig,
        transport: Arc<dyn TransportProvider>,
        poll_source: Option<Arc<dyn PollSource>>,
    ) -> Self {
        let registry = SubscriptionRegistry::new();
        let events = EventBus::new(config.event_capacity);
        let router = MessageRouter::new(registry.clone(), events.clone());
        let policy = ReconnectPolicy::new(config.reconnect_attempts, config.reconnect_delay());

        let shared = Arc::new(Shared {
            config,
            connection_id: Uuid::new_v4(),
            transport,
            poll_source,
            registry,
            router,
            events,
            state: Mutex::new(ConnState {
                status: ConnectionStatus::Disconnected,
                epoch: 0,
                link_seq: 0,
                handshake_in_flight: false,
                policy,
                link: None,
                reader: None,
                reconnect_timer: None,
                polling: None,
                last_connected_at: None,
            }),
        });

        Self { shared }
    }

    /// WebSocket transport plus HTTP polling against `http_base_url`
    pub fn from_config(config: RealtimeConfig, tokens: Arc<dyn TokenProvider>) -> Self {
        let transport: Arc<dyn TransportProvider> = Arc::new(WebSocketProvider::new());
        let poll_source: Arc<dyn PollSource> =
            Arc::new(HttpPollSource::new(config.http_base_url.clone(), tokens));
        Self::new(config, transport, Some(poll_source))
    }

    /// Open the transport.
    ///
    /// Resolves once the handshake succeeds. A failure of this attempt is
    /// returned, and the reconnect policy keeps trying in the background.
    /// Resets the retry budget and cancels any pending retry.
    pub async fn connect(&self) -> Result<(), ConnectError> {
        let epoch = {
            let mut state = self.shared.lock_state();
            if state.status == ConnectionStatus::Connected {
                debug!("Already connected");
                return Ok(());
            }
            state.cancel_reconnect();
            state.policy.reset();
            state.epoch += 1;
            state.status = ConnectionStatus::Connecting;
            state.handshake_in_flight = true;
            state.epoch
        };

        info!(url = %self.shared.config.ws_url, "Connecting");
        Shared::establish(&self.shared, epoch, Attempt::Caller).await
    }

    /// Close the transport and cancel every timer.
    ///
    /// Subscriptions are kept for the next `connect()`.
    pub fn disconnect(&self) {
        let mut state = self.shared.lock_state();

        state.epoch += 1;
        state.handshake_in_flight = false;
        state.cancel_reconnect();
        let polling_stopped = state.stop_polling();
        if let Some(link) = state.link.take() {
            link.close();
        }
        if let Some(reader) = state.reader.take() {
            reader.abort();
        }
        state.policy.reset();
        let previous = std::mem::replace(&mut state.status, ConnectionStatus::Disconnected);

        if polling_stopped {
            info!("Polling fallback stopped");
            self.shared.events.emit(ClientEvent::PollingStopped);
        }
        if previous != ConnectionStatus::Disconnected {
            info!(previous = %previous, "Disconnected");
            self.shared.events.emit(ClientEvent::Disconnected {
                code: Some(NORMAL_CLOSURE),
            });
        }
    }

    /// Register interest in a channel. Returns the subscription id.
    ///
    /// Sent to the server now if connected, otherwise on the next connect.
    pub fn subscribe<F>(&self, channel: &str, handler: F) -> String
    where
        F: Fn(&Frame) + Send + Sync + 'static,
    {
        let state = self.shared.lock_state();
        let subscription = self.shared.registry.insert(channel, Arc::new(handler));
        state.send_message(&subscription.subscribe_message());

        info!(
            subscription_id = %subscription.id,
            channel = %channel,
            "Subscribed"
        );
        subscription.id.clone()
    }

    /// Drop a subscription. Frames for it are ignored from now on.
    pub fn unsubscribe(&self, id: &str) {
        let state = self.shared.lock_state();
        match self.shared.registry.remove(id) {
            Some(subscription) => {
                state.send_message(&ClientMessage::Unsubscribe {
                    subscription_id: subscription.id.clone(),
                });
                info!(
                    subscription_id = %id,
                    channel = %subscription.channel,
                    "Unsubscribed"
                );
            }
            None => debug!(subscription_id = %id, "Unsubscribe for unknown subscription"),
        }
    }

    /// Fire-and-forget write. Dropped with a warning when not connected.
    pub fn send<T: Serialize + ?Sized>(&self, message: &T) {
        let text = match serde_json::to_string(message) {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Outbound frame not serializable");
                return;
            }
        };

        let state = self.shared.lock_state();
        if !state.send_text(text) {
            warn!(status = %state.status, "Transport not open, outbound frame dropped");
        }
    }

    pub fn status(&self) -> ConnectionSnapshot {
        let state = self.shared.lock_state();
        ConnectionSnapshot {
            id: self.shared.connection_id,
            status: state.status,
            attempt: state.policy.attempt(),
            polling: state.polling_active(),
            subscriptions: self.shared.registry.len(),
            last_connected_at: state.last_connected_at,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.shared.lock_state().status == ConnectionStatus::Connected
    }

    pub fn subscription_count(&self) -> usize {
        self.shared.registry.len()
    }

    /// Listen to status changes and traffic
    pub fn events(&self) -> broadcast::Receiver<ClientEvent> {
        self.shared.events.subscribe()
    }

    pub fn config(&self) -> &RealtimeConfig {
        &self.shared.config
    }
}
