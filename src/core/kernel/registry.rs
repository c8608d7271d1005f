//! Named socket table with per-channel connection state machine.
//!
//! Every channel name maps to at most one socket. Transitions follow
//! [`transition`]; connecting or disconnecting while a transition is already in
//! flight is rejected, never queued. Once a socket is open its transport events
//! are relayed as [`ChannelEvent`]s tagged with the channel name.

use crate::core::errors::GeminiError;
use crate::core::kernel::codec::decode_frame;
use crate::core::kernel::transport::{Outbound, SocketHandle, TransportEvent, WsTransport};
use crate::core::types::ChannelEvent;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, instrument, trace, warn};

const EVENT_BUFFER: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocketState {
    Absent,
    Connecting,
    Open,
    Closing,
    Closed,
}

impl SocketState {
    /// WebSocket `readyState` number; `None` when no socket exists
    pub const fn ready_state(self) -> Option<u16> {
        match self {
            Self::Absent => None,
            Self::Connecting => Some(0),
            Self::Open => Some(1),
            Self::Closing => Some(2),
            Self::Closed => Some(3),
        }
    }
}

impl fmt::Display for SocketState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Absent => "ABSENT",
            Self::Connecting => "CONNECTING",
            Self::Open => "OPEN",
            Self::Closing => "CLOSING",
            Self::Closed => "CLOSED",
        };
        match self.ready_state() {
            Some(code) => write!(f, "{} ({})", name, code),
            None => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Connect,
    Disconnect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Already in the requested state
    Noop,
    Begin,
    Reject,
}

pub const fn transition(state: SocketState, operation: Operation) -> Action {
    use SocketState::{Absent, Closed, Closing, Connecting, Open};
    match (state, operation) {
        (Connecting | Closing, _) => Action::Reject,
        (Open, Operation::Connect) | (Absent | Closed, Operation::Disconnect) => Action::Noop,
        (Absent | Closed, Operation::Connect) | (Open, Operation::Disconnect) => Action::Begin,
    }
}

struct Entry {
    state: SocketState,
    generation: u64,
    outbound: Option<mpsc::UnboundedSender<Outbound>>,
    pending_close: Option<oneshot::Sender<Result<(), GeminiError>>>,
}

type Entries = Arc<Mutex<HashMap<String, Entry>>>;

fn lock(entries: &Mutex<HashMap<String, Entry>>) -> MutexGuard<'_, HashMap<String, Entry>> {
    // Critical sections never panic midway, so the map is consistent even if poisoned
    entries.lock().unwrap_or_else(PoisonError::into_inner)
}

fn emit(events: &broadcast::Sender<ChannelEvent>, event: ChannelEvent) {
    // No receivers is fine: unobserved events are dropped
    let _ = events.send(event);
}

/// Owns every socket of one client.
pub struct SocketRegistry<T: WsTransport> {
    transport: T,
    entries: Entries,
    events: broadcast::Sender<ChannelEvent>,
    generations: AtomicU64,
}

impl<T: WsTransport> SocketRegistry<T> {
    pub fn new(transport: T) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            transport,
            entries: Arc::new(Mutex::new(HashMap::new())),
            events,
            generations: AtomicU64::new(0),
        }
    }

    /// New receiver for events of every channel
    pub fn subscribe_events(&self) -> broadcast::Receiver<ChannelEvent> {
        self.events.subscribe()
    }

    pub fn state(&self, name: &str) -> SocketState {
        lock(&self.entries)
            .get(name)
            .map_or(SocketState::Absent, |entry| entry.state)
    }

    /// Names of channels currently open
    pub fn open_channels(&self) -> Vec<String> {
        let mut names: Vec<String> = lock(&self.entries)
            .iter()
            .filter(|(_, entry)| entry.state == SocketState::Open)
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// Open a socket for `name`, resolving once the transport reports it open.
    ///
    /// Returns immediately if the channel is already open.
    #[instrument(skip(self, headers), fields(channel = %name))]
    pub async fn connect(
        &self,
        name: &str,
        url: &str,
        headers: &[(String, String)],
    ) -> Result<(), GeminiError> {
        let generation = {
            let mut entries = lock(&self.entries);
            let state = entries.get(name).map_or(SocketState::Absent, |e| e.state);
            match transition(state, Operation::Connect) {
                Action::Noop => return Ok(()),
                Action::Reject => {
                    return Err(GeminiError::InvalidState {
                        channel: name.to_string(),
                        state,
                    })
                }
                Action::Begin => {}
            }

            let generation = self.generations.fetch_add(1, Ordering::Relaxed);
            entries.insert(
                name.to_string(),
                Entry {
                    state: SocketState::Connecting,
                    generation,
                    outbound: None,
                    pending_close: None,
                },
            );
            generation
        };
        debug!(generation, "connecting");

        let mut guard = PendingConnect {
            entries: &self.entries,
            name,
            generation,
            armed: true,
        };

        let SocketHandle {
            outbound,
            mut events,
        } = self.transport.open(url, headers)?;

        loop {
            match events.recv().await {
                Some(TransportEvent::Open) => break,
                Some(TransportEvent::Error(Some(reason))) => {
                    return Err(GeminiError::Transport(reason));
                }
                Some(TransportEvent::Error(None)) => trace!("ignoring empty transport error"),
                Some(TransportEvent::Message(_)) => trace!("dropping frame received before open"),
                Some(TransportEvent::Close) | None => {
                    return Err(GeminiError::Transport(
                        "socket closed before opening".to_string(),
                    ));
                }
            }
        }

        {
            let mut entries = lock(&self.entries);
            match entries.get_mut(name) {
                Some(entry) if entry.generation == generation => {
                    entry.state = SocketState::Open;
                    entry.outbound = Some(outbound);
                }
                _ => {
                    return Err(GeminiError::Transport(
                        "socket slot was released while connecting".to_string(),
                    ))
                }
            }
        }
        guard.armed = false;
        debug!(generation, "open");

        emit(
            &self.events,
            ChannelEvent::Open {
                channel: name.to_string(),
            },
        );

        tokio::spawn(relay(
            name.to_string(),
            generation,
            events,
            Arc::clone(&self.entries),
            self.events.clone(),
        ));

        Ok(())
    }

    /// Close the socket for `name`, resolving once the transport reports it closed.
    ///
    /// Returns immediately if the channel is closed or was never opened.
    #[instrument(skip(self), fields(channel = %name))]
    pub async fn disconnect(&self, name: &str) -> Result<(), GeminiError> {
        let closed = {
            let mut entries = lock(&self.entries);
            let Some(entry) = entries.get_mut(name) else {
                return Ok(());
            };
            match transition(entry.state, Operation::Disconnect) {
                Action::Noop => return Ok(()),
                Action::Reject => {
                    return Err(GeminiError::InvalidState {
                        channel: name.to_string(),
                        state: entry.state,
                    })
                }
                Action::Begin => {}
            }

            let (tx, rx) = oneshot::channel();
            entry.state = SocketState::Closing;
            entry.pending_close = Some(tx);
            if let Some(outbound) = &entry.outbound {
                // A stopped socket task closes its event stream, which the relay treats as a close
                let _ = outbound.send(Outbound::Close);
            }
            rx
        };
        debug!("closing");

        match closed.await {
            Ok(result) => result,
            Err(_) => Ok(()),
        }
    }

    /// Send a text frame on an open channel
    pub fn send(&self, name: &str, text: String) -> Result<(), GeminiError> {
        let entries = lock(&self.entries);
        match entries.get(name) {
            Some(Entry {
                state: SocketState::Open,
                outbound: Some(outbound),
                ..
            }) => outbound
                .send(Outbound::Text(text))
                .map_err(|_| GeminiError::Transport(format!("socket for '{}' has stopped", name))),
            _ => Err(GeminiError::NotConnected(name.to_string())),
        }
    }
}

/// Releases the slot if a connect attempt fails or is dropped before opening.
struct PendingConnect<'a> {
    entries: &'a Mutex<HashMap<String, Entry>>,
    name: &'a str,
    generation: u64,
    armed: bool,
}

impl Drop for PendingConnect<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut entries = lock(self.entries);
        if entries
            .get(self.name)
            .is_some_and(|entry| entry.generation == self.generation)
        {
            entries.remove(self.name);
            debug!(channel = %self.name, "connect abandoned, slot released");
        }
    }
}

#[instrument(skip(events, entries, sink), fields(channel = %name))]
async fn relay(
    name: String,
    generation: u64,
    mut events: mpsc::UnboundedReceiver<TransportEvent>,
    entries: Entries,
    sink: broadcast::Sender<ChannelEvent>,
) {
    while let Some(event) = events.recv().await {
        match event {
            TransportEvent::Message(raw) => match decode_frame(&raw) {
                Ok(payload) => emit(
                    &sink,
                    ChannelEvent::Message {
                        channel: name.clone(),
                        payload,
                    },
                ),
                Err(error) => {
                    warn!(%error, "unparseable frame");
                    emit(
                        &sink,
                        ChannelEvent::Error {
                            channel: name.clone(),
                            error: Arc::new(error),
                        },
                    );
                }
            },
            TransportEvent::Error(None) => trace!("ignoring empty transport error"),
            TransportEvent::Error(Some(reason)) => {
                let error = GeminiError::Transport(reason);
                let pending = lock(&entries)
                    .get_mut(&name)
                    .filter(|entry| entry.generation == generation)
                    .and_then(|entry| entry.pending_close.take());
                match pending {
                    Some(waiter) => {
                        let _ = waiter.send(Err(error));
                    }
                    None => {
                        warn!(%error, "transport error");
                        emit(
                            &sink,
                            ChannelEvent::Error {
                                channel: name.clone(),
                                error: Arc::new(error),
                            },
                        );
                    }
                }
            }
            TransportEvent::Open => trace!("ignoring repeated open"),
            TransportEvent::Close => break,
        }
    }

    let pending = {
        let mut entries = lock(&entries);
        match entries.get_mut(&name) {
            Some(entry) if entry.generation == generation => {
                entry.state = SocketState::Closed;
                entry.outbound = None;
                entry.pending_close.take()
            }
            _ => None,
        }
    };
    debug!(generation, "closed");

    emit(&sink, ChannelEvent::Close { channel: name });
    if let Some(waiter) = pending {
        let _ = waiter.send(Ok(()));
    }
}
