//! WebSocket implementation of the session transport.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use super::messages::{AudioMessage, ServerMessage, SetupMessage};
use super::{SessionDirectives, SessionTransport, TransportHandle, TransportWires};
use crate::error::SessionError;

/// Duplex WebSocket link to the conversational audio service.
pub struct WebSocketTransport {
    url: String,
}

impl WebSocketTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// Build the endpoint URL, appending the API key as a query parameter
    /// when the named environment variable is set.
    pub fn from_settings(url: &str, api_key_env: Option<&str>) -> Self {
        let url = match api_key_env.and_then(|name| std::env::var(name).ok()) {
            Some(key) if !key.is_empty() => {
                let separator = if url.contains('?') { '&' } else { '?' };
                format!("{url}{separator}key={key}")
            }
            _ => url.to_string(),
        };
        Self { url }
    }
}

#[async_trait]
impl SessionTransport for WebSocketTransport {
    async fn open(
        &self,
        directives: &SessionDirectives,
    ) -> Result<TransportHandle, SessionError> {
        let (socket, _response) = connect_async(&self.url)
            .await
            .map_err(|e| SessionError::Connection(format!("WebSocket connect failed: {e}")))?;

        let (mut ws_tx, mut ws_rx) = socket.split();

        let setup = SetupMessage::from_directives(directives);
        let setup_json = serde_json::to_string(&setup)
            .map_err(|e| SessionError::Connection(format!("Failed to encode setup: {e}")))?;
        ws_tx
            .send(Message::Text(setup_json))
            .await
            .map_err(|e| SessionError::Connection(format!("Failed to send setup: {e}")))?;

        info!("Transport connected");

        let (handle, wires) = TransportHandle::pair();
        let TransportWires {
            mut outbound,
            events,
            closed,
        } = wires;

        // Writer: frames from the handle onto the wire.
        let mut writer_closed = closed.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    maybe_payload = outbound.recv() => {
                        let Some(payload) = maybe_payload else { break };
                        let message = AudioMessage::from_payload(&payload);
                        let json = match serde_json::to_string(&message) {
                            Ok(json) => json,
                            Err(e) => {
                                warn!("Failed to encode outbound frame: {e}");
                                continue;
                            }
                        };
                        if ws_tx.send(Message::Text(json)).await.is_err() {
                            debug!("Wire rejected outbound frame; writer stopping");
                            break;
                        }
                    }
                    _ = writer_closed.changed() => {
                        let _ = ws_tx.send(Message::Close(None)).await;
                        break;
                    }
                }
            }
        });

        // Reader: wire messages into core events.
        let mut reader_closed = closed;
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    maybe_message = ws_rx.next() => {
                        let text = match maybe_message {
                            Some(Ok(Message::Text(text))) => text,
                            Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes) {
                                Ok(text) => text,
                                Err(_) => {
                                    warn!("Skipping non-UTF-8 binary message");
                                    continue;
                                }
                            },
                            Some(Ok(Message::Close(_))) | None => break,
                            Some(Ok(_)) => continue,
                            Some(Err(e)) => {
                                warn!("Transport read error: {e}");
                                break;
                            }
                        };

                        let parsed: ServerMessage = match serde_json::from_str(&text) {
                            Ok(parsed) => parsed,
                            Err(e) => {
                                warn!("Skipping unparseable server message: {e}");
                                continue;
                            }
                        };
                        for event in parsed.into_events() {
                            if events.send(event).await.is_err() {
                                return;
                            }
                        }
                    }
                    _ = reader_closed.changed() => break,
                }
            }
        });

        Ok(handle)
    }
}
