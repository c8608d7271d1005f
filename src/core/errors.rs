use crate::core::kernel::registry::SocketState;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GeminiError {
    /// A connect or disconnect was issued while another transition is in flight.
    #[error("Invalid socket state for channel '{channel}': {state}")]
    InvalidState { channel: String, state: SocketState },

    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    #[error("Channel not connected: {0}")]
    NotConnected(String),

    #[error("Transport error: {0}")]
    Transport(String),

    /// Never returned from an awaited call; only delivered as an `error` event.
    #[error("Malformed frame: {0}")]
    MalformedFrame(#[source] serde_json::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("API error: {reason} - {message}")]
    Api { reason: String, message: String },

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::core::config::ConfigError),
}
