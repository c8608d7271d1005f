use crate::core::errors::GeminiError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Entry in a V2 subscribe/unsubscribe control message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub name: String,
    pub symbols: Vec<String>,
}

impl Subscription {
    pub fn new(name: impl Into<String>, symbols: &[&str]) -> Self {
        Self {
            name: name.into(),
            symbols: symbols.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlType {
    Subscribe,
    Unsubscribe,
}

/// `{"type": "subscribe"|"unsubscribe", "subscriptions": [...]}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlMessage {
    #[serde(rename = "type")]
    pub kind: ControlType,
    pub subscriptions: Vec<Subscription>,
}

/// Library-level socket events, each tagged with the channel it came from.
#[derive(Debug, Clone)]
pub enum ChannelEvent {
    Open { channel: String },
    Close { channel: String },
    Message { channel: String, payload: Value },
    Error {
        channel: String,
        error: Arc<GeminiError>,
    },
}

impl ChannelEvent {
    pub fn channel(&self) -> &str {
        match self {
            Self::Open { channel }
            | Self::Close { channel }
            | Self::Message { channel, .. }
            | Self::Error { channel, .. } => channel,
        }
    }
}
