use crate::core::errors::GeminiError;
use reqwest::Url;

pub const ORDERS_CHANNEL: &str = "orders";
pub const V2_CHANNEL: &str = "v2";

pub const MARKET_DATA_PATH: &str = "/v1/marketdata";
pub const ORDER_EVENTS_PATH: &str = "/v1/order/events";
pub const V2_MARKET_DATA_PATH: &str = "/v2/marketdata";

/// One independently connectable stream.
///
/// The registry keys sockets by [`Channel::name`]: the symbol for market data,
/// the literals `"orders"` and `"v2"` otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Public per-symbol market data (`/v1/marketdata/{symbol}`)
    Market(String),
    /// Private order events, authenticated at the handshake
    Orders,
    /// Shared multi-symbol market data driven by subscribe messages
    V2,
}

impl Channel {
    pub fn market(symbol: impl Into<String>) -> Self {
        Self::Market(symbol.into())
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Market(symbol) => symbol,
            Self::Orders => ORDERS_CHANNEL,
            Self::V2 => V2_CHANNEL,
        }
    }

    pub fn path(&self) -> String {
        match self {
            Self::Market(symbol) => format!("{}/{}", MARKET_DATA_PATH, symbol),
            Self::Orders => ORDER_EVENTS_PATH.to_string(),
            Self::V2 => V2_MARKET_DATA_PATH.to_string(),
        }
    }

    /// Full socket URL on `base` with the given query pairs, in order.
    pub fn url(&self, base: &str, query: &[(&str, String)]) -> Result<String, GeminiError> {
        let raw = format!("{}{}", base.trim_end_matches('/'), self.path());
        let mut url = Url::parse(&raw).map_err(|e| {
            GeminiError::InvalidParameters(format!("Invalid WebSocket URL '{}': {}", raw, e))
        })?;

        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }

        Ok(url.into())
    }
}
