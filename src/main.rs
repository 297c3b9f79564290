use anyhow::{Context, Result};
use pulse::config::load_config;
use pulse::{ClientEvent, EnvToken, MonitorConfig, RealtimeClient, RealtimeConfig};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pulse=info".into()),
        )
        .init();

    info!("Pulse monitor starting...");

    let mut config = match std::env::var("PULSE_CONFIG") {
        Ok(path) => {
            info!(path = %path, "Loading configuration");
            load_config(&path)?
        }
        Err(_) => MonitorConfig::default(),
    };
    // Env vars win over the file
    config.realtime = config
        .realtime
        .with_env_overrides(|key| std::env::var(key).ok());

    log_settings(&config.realtime);

    let tokens = Arc::new(EnvToken::new(config.token_env.clone()));
    let client = RealtimeClient::from_config(config.realtime.clone(), tokens);

    let mut events = client.events();
    let event_log = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => log_event(&event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped = skipped, "Event log lagging");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    for channel in &config.channels {
        let name = channel.clone();
        let id = client.subscribe(channel, move |frame| {
            info!(
                channel = %name,
                frame_type = %frame.frame_type,
                timestamp = frame.timestamp,
                data = %frame.data,
                "Update"
            );
        });
        info!(channel = %channel, subscription_id = %id, "Watching channel");
    }

    if let Err(e) = client.connect().await {
        // Reconnect and polling carry on in the background
        error!(error = %e, "Initial connect failed");
    }

    // Wait for shutdown signal
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl_c signal")?;
    info!("Shutdown signal received");

    client.disconnect();
    drop(client);
    event_log.abort();

    Ok(())
}

fn log_settings(config: &RealtimeConfig) {
    info!(
        ws_url = %config.ws_url,
        http_base_url = %config.http_base_url,
        reconnect_attempts = config.reconnect_attempts,
        reconnect_delay_ms = config.reconnect_delay_ms,
        polling_interval_ms = config.polling_interval_ms,
        enable_polling = config.enable_polling,
        "Realtime settings"
    );
}

fn log_event(event: &ClientEvent) {
    match event {
        ClientEvent::Connected { connection_id } => {
            info!(connection_id = %connection_id, "Connected")
        }
        ClientEvent::Disconnected { code } => warn!(code = ?code, "Disconnected"),
        ClientEvent::Reconnecting { attempt, delay } => info!(
            attempt = attempt,
            delay_ms = delay.as_millis() as u64,
            "Reconnecting"
        ),
        ClientEvent::ReconnectFailed { attempts } => {
            error!(attempts = attempts, "Giving up on push transport")
        }
        ClientEvent::PollingStarted => info!("Polling fallback active"),
        ClientEvent::PollingStopped => info!("Polling fallback stopped"),
        ClientEvent::Error { message } => warn!(error = %message, "Client error"),
        ClientEvent::SubscriptionConfirmed(frame) => {
            info!(subscription_id = ?frame.id, "Subscription confirmed")
        }
        ClientEvent::SubscriptionError(frame) => {
            error!(subscription_id = ?frame.id, data = %frame.data, "Subscription rejected")
        }
        // Per-channel handlers already log payloads
        ClientEvent::Message(_) => {}
    }
}
