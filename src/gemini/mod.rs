pub mod channel;
pub mod types;

pub mod builder;
pub mod client;
pub mod rest;
pub mod websocket;

// Re-export main components
pub use builder::GeminiBuilder;
pub use channel::Channel;
pub use client::GeminiClient;
pub use rest::GeminiRest;
pub use types::{
    Balance, MarketDataParams, NewOrderRequest, OrderEventsParams, OrderSide, OrderStatus,
    OrderType, PastTradesParams, Ticker,
};
pub use websocket::GeminiWs;
