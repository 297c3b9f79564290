use super::{Outbound, TransportEvent, TransportLink, TransportPeer, TransportProvider};
use crate::error::TransportError;
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket transport over tokio-tungstenite.
///
/// Handshake deadlines are enforced by the client, not here.
#[derive(Debug, Default, Clone)]
pub struct WebSocketProvider;

impl WebSocketProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TransportProvider for WebSocketProvider {
    async fn open(&self, url: &str) -> Result<TransportLink, TransportError> {
        debug!(url = %url, "Opening WebSocket");

        let (socket, _response) = connect_async(url)
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        info!(url = %url, "WebSocket handshake complete");

        let (link, peer) = TransportLink::pair();
        tokio::spawn(pump(socket, peer));
        Ok(link)
    }
}

/// Shuttle frames between the socket and the link until either side ends.
async fn pump(socket: Socket, mut peer: TransportPeer) {
    let (mut sink, mut source) = socket.split();

    loop {
        tokio::select! {
            outbound = peer.outbound.recv() => {
                match outbound {
                    Some(Outbound::Text(text)) => {
                        if let Err(e) = sink.send(Message::Text(text)).await {
                            warn!(error = %e, "WebSocket write failed");
                            let _ = peer.inbound.send(TransportEvent::Error(e.to_string()));
                            let _ = peer.inbound.send(TransportEvent::Closed { code: None });
                            return;
                        }
                    }
                    // Explicit close, or every sender dropped
                    Some(Outbound::Close) | None => {
                        let frame = CloseFrame {
                            code: CloseCode::Normal,
                            reason: "client disconnect".into(),
                        };
                        let _ = sink.send(Message::Close(Some(frame))).await;
                        let _ = sink.close().await;
                        debug!("WebSocket closed by client");
                        return;
                    }
                }
            }

            incoming = source.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        if peer.inbound.send(TransportEvent::Frame(text)).is_err() {
                            // Reader gone; nobody left to deliver to
                            let _ = sink.close().await;
                            return;
                        }
                    }
                    Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes) {
                        Ok(text) => {
                            let _ = peer.inbound.send(TransportEvent::Frame(text));
                        }
                        Err(_) => warn!("Dropping non-UTF-8 binary frame"),
                    },
                    Some(Ok(Message::Close(frame))) => {
                        let code = frame.map(|f| u16::from(f.code));
                        debug!(code = ?code, "WebSocket closed by server");
                        let _ = peer.inbound.send(TransportEvent::Closed { code });
                        return;
                    }
                    Some(Ok(_)) => {
                        // Protocol-level ping/pong is answered by tungstenite
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "WebSocket error");
                        let _ = peer.inbound.send(TransportEvent::Error(e.to_string()));
                        let _ = peer.inbound.send(TransportEvent::Closed { code: None });
                        return;
                    }
                    None => {
                        let _ = peer.inbound.send(TransportEvent::Closed { code: None });
                        return;
                    }
                }
            }
        }
    }
}
