use crate::core::errors::GeminiError;
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue, Request};
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use tracing::{debug, instrument, trace};

/// Raw events reported by a socket, in delivery order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Open,
    Message(String),
    /// Some transports fire error events with no payload; those carry `None`.
    Error(Option<String>),
    Close,
}

/// Commands accepted by a socket
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Text(String),
    Close,
}

/// Both ends of one live socket as seen by the registry.
#[derive(Debug)]
pub struct SocketHandle {
    pub outbound: mpsc::UnboundedSender<Outbound>,
    pub events: mpsc::UnboundedReceiver<TransportEvent>,
}

/// Opens sockets.
///
/// `open` must return without waiting for the handshake; readiness is
/// reported through `TransportEvent::Open` (or `Error`/`Close` on failure).
pub trait WsTransport: Send + Sync + 'static {
    fn open(&self, url: &str, headers: &[(String, String)]) -> Result<SocketHandle, GeminiError>;
}

#[derive(Debug, Clone, Default)]
pub struct WsConfig {
    /// Give up on the handshake after this long. `None` waits indefinitely.
    pub connect_timeout: Option<Duration>,
}

/// `tokio-tungstenite` transport. Each socket runs on its own task.
#[derive(Debug, Clone, Default)]
pub struct TungsteniteTransport {
    config: WsConfig,
}

impl TungsteniteTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: WsConfig) -> Self {
        self.config = config;
        self
    }
}

impl WsTransport for TungsteniteTransport {
    fn open(&self, url: &str, headers: &[(String, String)]) -> Result<SocketHandle, GeminiError> {
        let request = build_request(url, headers)?;
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        tokio::spawn(run_socket(
            request,
            self.config.connect_timeout,
            outbound_rx,
            events_tx,
        ));

        Ok(SocketHandle {
            outbound: outbound_tx,
            events: events_rx,
        })
    }
}

fn build_request(url: &str, headers: &[(String, String)]) -> Result<Request<()>, GeminiError> {
    let mut request = url
        .into_client_request()
        .map_err(|e| GeminiError::InvalidParameters(format!("Invalid WebSocket URL '{}': {}", url, e)))?;

    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| GeminiError::InvalidParameters(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| GeminiError::InvalidParameters(format!("Invalid header value: {}", e)))?;
        request.headers_mut().insert(name, value);
    }

    Ok(request)
}

#[instrument(skip_all, fields(url = %request.uri()))]
async fn run_socket(
    request: Request<()>,
    connect_timeout: Option<Duration>,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    events: mpsc::UnboundedSender<TransportEvent>,
) {
    let connecting = connect_async(request);
    let connected = match connect_timeout {
        Some(limit) => match tokio::time::timeout(limit, connecting).await {
            Ok(result) => result,
            Err(_) => {
                let _ = events.send(TransportEvent::Error(Some(
                    "WebSocket connection timeout".to_string(),
                )));
                return;
            }
        },
        None => connecting.await,
    };

    let ws_stream = match connected {
        Ok((ws_stream, _)) => ws_stream,
        Err(e) => {
            let _ = events.send(TransportEvent::Error(Some(format!(
                "WebSocket connection failed: {}",
                e
            ))));
            return;
        }
    };

    debug!("socket open");
    let _ = events.send(TransportEvent::Open);
    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            command = outbound.recv() => match command {
                Some(Outbound::Text(text)) => {
                    if let Err(e) = write.send(Message::Text(text)).await {
                        let _ = events.send(TransportEvent::Error(Some(format!(
                            "Failed to send WebSocket message: {}",
                            e
                        ))));
                    }
                }
                Some(Outbound::Close) | None => {
                    // Wait for the peer's close frame on the read side
                    if let Err(e) = write.send(Message::Close(None)).await {
                        let _ = events.send(TransportEvent::Error(Some(format!(
                            "Failed to close WebSocket: {}",
                            e
                        ))));
                        let _ = events.send(TransportEvent::Close);
                        return;
                    }
                    drain_until_close(&mut read, &events).await;
                    return;
                }
            },
            frame = read.next() => match frame {
                Some(Ok(message)) => {
                    if !forward(message, &events) {
                        let _ = events.send(TransportEvent::Close);
                        return;
                    }
                }
                Some(Err(e)) => {
                    let _ = events.send(TransportEvent::Error(Some(format!("WebSocket error: {}", e))));
                    let _ = events.send(TransportEvent::Close);
                    return;
                }
                None => {
                    let _ = events.send(TransportEvent::Close);
                    return;
                }
            },
        }
    }
}

type WsRead = futures_util::stream::SplitStream<
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
>;

async fn drain_until_close(read: &mut WsRead, events: &mpsc::UnboundedSender<TransportEvent>) {
    while let Some(frame) = read.next().await {
        match frame {
            Ok(message) => {
                if !forward(message, events) {
                    break;
                }
            }
            Err(e) => {
                trace!("error while closing: {}", e);
                break;
            }
        }
    }
    let _ = events.send(TransportEvent::Close);
}

/// Forward a data frame. Returns `false` on a close frame.
fn forward(message: Message, events: &mpsc::UnboundedSender<TransportEvent>) -> bool {
    match message {
        Message::Text(text) => {
            let _ = events.send(TransportEvent::Message(text));
        }
        Message::Binary(data) => {
            let _ = events.send(binary_event(data));
        }
        Message::Close(_) => return false,
        // tungstenite answers pings itself
        Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
    }
    true
}

/// Binary frames carry the same JSON as text frames; invalid UTF-8 is an error, not a message.
fn binary_event(data: Vec<u8>) -> TransportEvent {
    match String::from_utf8(data) {
        Ok(text) => TransportEvent::Message(text),
        Err(e) => TransportEvent::Error(Some(format!("Binary frame is not valid UTF-8: {}", e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_frames_decode_as_text() {
        assert_eq!(
            binary_event(br#"{"type":"heartbeat"}"#.to_vec()),
            TransportEvent::Message(r#"{"type":"heartbeat"}"#.to_string())
        );
    }

    #[test]
    fn test_invalid_utf8_binary_frame_is_an_error() {
        match binary_event(vec![b'{', 0xff, 0xfe, b'}']) {
            TransportEvent::Error(Some(reason)) => assert!(reason.contains("UTF-8")),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_build_request_carries_headers() {
        let headers = vec![
            ("X-GEMINI-PAYLOAD".to_string(), "abc=".to_string()),
            ("X-GEMINI-APIKEY".to_string(), "mykey".to_string()),
        ];
        let request = build_request("wss://api.gemini.com/v1/order/events", &headers).unwrap();
        assert_eq!(request.headers()["x-gemini-payload"], "abc=");
        assert_eq!(request.headers()["x-gemini-apikey"], "mykey");
    }

    #[test]
    fn test_build_request_rejects_bad_url() {
        let result = build_request("not a url", &[]);
        assert!(matches!(result, Err(GeminiError::InvalidParameters(_))));
    }
}
