#![allow(dead_code)]

use async_trait::async_trait;
use gemini_api::core::kernel::rest::{parse_error_body, RestClient};
use gemini_api::core::kernel::transport::{Outbound, SocketHandle, TransportEvent, WsTransport};
use gemini_api::{Channel, ChannelEvent, GeminiError, GeminiWs, SocketState};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, Notify};

pub const WAIT: Duration = Duration::from_secs(2);
const POLL: Duration = Duration::from_millis(10);

/// One socket opened through [`MockTransport`]
#[derive(Clone)]
pub struct MockSocket {
    pub url: String,
    pub headers: Vec<(String, String)>,
    events: mpsc::UnboundedSender<TransportEvent>,
    sent: Arc<Mutex<Vec<Outbound>>>,
    halt: Arc<Notify>,
}

impl MockSocket {
    /// Stop the socket task without reporting anything, dropping its command queue
    pub fn halt(&self) {
        self.halt.notify_one();
    }

    /// Push a raw transport event as if the server produced it
    pub fn emit(&self, event: TransportEvent) {
        let _ = self.events.send(event);
    }

    pub fn sent(&self) -> Vec<Outbound> {
        self.sent.lock().unwrap().clone()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub async fn wait_for_sent(&self, count: usize) -> Vec<Outbound> {
        let deadline = tokio::time::Instant::now() + WAIT;
        loop {
            let sent = self.sent();
            if sent.len() >= count {
                return sent;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "expected {} outbound commands, saw {:?}",
                count,
                sent
            );
            tokio::time::sleep(POLL).await;
        }
    }
}

#[derive(Default)]
struct MockState {
    sockets: Vec<MockSocket>,
}

/// In-memory transport.
///
/// With `auto` behaviour every socket reports `Open` immediately and answers a
/// close command with `Close`. With `manual` behaviour the test drives both.
#[derive(Clone)]
pub struct MockTransport {
    auto_open: bool,
    auto_close: bool,
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn auto() -> Self {
        Self {
            auto_open: true,
            auto_close: true,
            state: Arc::default(),
        }
    }

    pub fn manual() -> Self {
        Self {
            auto_open: false,
            auto_close: false,
            state: Arc::default(),
        }
    }

    /// Opens immediately but leaves closing to the test
    pub fn open_only() -> Self {
        Self {
            auto_open: true,
            auto_close: false,
            state: Arc::default(),
        }
    }

    pub fn open_count(&self) -> usize {
        self.state.lock().unwrap().sockets.len()
    }

    pub fn socket(&self, index: usize) -> MockSocket {
        self.state.lock().unwrap().sockets[index].clone()
    }

    pub async fn wait_for_socket(&self, index: usize) -> MockSocket {
        let deadline = tokio::time::Instant::now() + WAIT;
        loop {
            if self.open_count() > index {
                return self.socket(index);
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "socket {} was never opened",
                index
            );
            tokio::time::sleep(POLL).await;
        }
    }
}

impl WsTransport for MockTransport {
    fn open(&self, url: &str, headers: &[(String, String)]) -> Result<SocketHandle, GeminiError> {
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let sent = Arc::new(Mutex::new(Vec::new()));
        let halt = Arc::new(Notify::new());

        if self.auto_open {
            let _ = events_tx.send(TransportEvent::Open);
        }

        let auto_close = self.auto_close;
        let task_events = events_tx.clone();
        let task_sent = Arc::clone(&sent);
        let task_halt = Arc::clone(&halt);
        tokio::spawn(async move {
            loop {
                let command = tokio::select! {
                    command = outbound_rx.recv() => command,
                    () = task_halt.notified() => None,
                };
                let Some(command) = command else { break };
                let is_close = command == Outbound::Close;
                task_sent.lock().unwrap().push(command);
                if is_close && auto_close {
                    let _ = task_events.send(TransportEvent::Close);
                }
            }
        });

        self.state.lock().unwrap().sockets.push(MockSocket {
            url: url.to_string(),
            headers: headers.to_vec(),
            events: events_tx,
            sent,
            halt,
        });

        Ok(SocketHandle {
            outbound: outbound_tx,
            events: events_rx,
        })
    }
}

pub async fn next_event(events: &mut broadcast::Receiver<ChannelEvent>) -> ChannelEvent {
    tokio::time::timeout(WAIT, events.recv())
        .await
        .expect("timed out waiting for an event")
        .expect("event stream closed")
}

pub async fn wait_for_state<T: WsTransport>(ws: &GeminiWs<T>, channel: &Channel, state: SocketState) {
    let deadline = tokio::time::Instant::now() + WAIT;
    while ws.state(channel) != state {
        assert!(
            tokio::time::Instant::now() < deadline,
            "{} stuck in {} waiting for {}",
            channel.name(),
            ws.state(channel),
            state
        );
        tokio::time::sleep(POLL).await;
    }
}

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: &'static str,
    pub endpoint: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RecordedCall {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// REST client that records each call and answers with a canned body
#[derive(Clone)]
pub struct RecordingRest {
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    status: u16,
    response: Arc<String>,
}

impl RecordingRest {
    pub fn responding(body: &str) -> Self {
        Self {
            calls: Arc::default(),
            status: 200,
            response: Arc::new(body.to_string()),
        }
    }

    pub fn failing(status: u16, body: &str) -> Self {
        Self {
            status,
            ..Self::responding(body)
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    fn answer(&self) -> Result<Value, GeminiError> {
        if self.status == 200 {
            Ok(serde_json::from_str(&self.response)?)
        } else {
            Err(parse_error_body(self.status, &self.response))
        }
    }
}

#[async_trait]
impl RestClient for RecordingRest {
    async fn get(&self, endpoint: &str, _query_params: &[(&str, &str)]) -> Result<Value, GeminiError> {
        self.calls.lock().unwrap().push(RecordedCall {
            method: "GET",
            endpoint: endpoint.to_string(),
            headers: Vec::new(),
            body: Vec::new(),
        });
        self.answer()
    }

    async fn post(
        &self,
        endpoint: &str,
        headers: &[(String, String)],
        body: &[u8],
    ) -> Result<Value, GeminiError> {
        self.calls.lock().unwrap().push(RecordedCall {
            method: "POST",
            endpoint: endpoint.to_string(),
            headers: headers.to_vec(),
            body: body.to_vec(),
        });
        self.answer()
    }
}
