pub mod core;
pub mod gemini;

pub use core::{
    config::GeminiConfig,
    errors::GeminiError,
    kernel::registry::SocketState,
    types::{ChannelEvent, ControlType, Subscription},
};
pub use gemini::{Channel, GeminiBuilder, GeminiClient, GeminiRest, GeminiWs};
