use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Feed selection for a v1 market data socket.
///
/// Only flags that are set end up in the query string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketDataParams {
    pub heartbeat: Option<bool>,
    pub top_of_book: Option<bool>,
    pub bids: Option<bool>,
    pub offers: Option<bool>,
    pub trades: Option<bool>,
    pub auctions: Option<bool>,
}

impl MarketDataParams {
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        [
            ("heartbeat", self.heartbeat),
            ("top_of_book", self.top_of_book),
            ("bids", self.bids),
            ("offers", self.offers),
            ("trades", self.trades),
            ("auctions", self.auctions),
        ]
        .into_iter()
        .filter_map(|(key, flag)| flag.map(|flag| (key, flag.to_string())))
        .collect()
    }
}

/// Options for the private order events socket.
///
/// `account` is part of the signed handshake payload; the filters are sent in
/// the query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderEventsParams {
    pub account: Option<String>,
    pub symbol_filter: Vec<String>,
    pub api_session_filter: Vec<String>,
    pub event_type_filter: Vec<String>,
    pub heartbeat: Option<bool>,
}

impl OrderEventsParams {
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        pairs.extend(self.symbol_filter.iter().map(|s| ("symbolFilter", s.clone())));
        pairs.extend(
            self.api_session_filter
                .iter()
                .map(|s| ("apiSessionFilter", s.clone())),
        );
        pairs.extend(
            self.event_type_filter
                .iter()
                .map(|s| ("eventTypeFilter", s.clone())),
        );
        if let Some(heartbeat) = self.heartbeat {
            pairs.push(("heartbeat", heartbeat.to_string()));
        }
        pairs
    }
}

/// Signed fields of the order events handshake beyond `request` and `nonce`
#[derive(Debug, Clone, Serialize)]
pub struct OrderEventsPayload<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<&'a str>,
}

/// Endpoint parameters plus the optional sub-account every private call accepts
#[derive(Debug, Clone, Serialize)]
pub struct AccountScoped<'a, P: Serialize> {
    #[serde(flatten)]
    pub params: P,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<&'a str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    #[serde(rename = "exchange limit")]
    ExchangeLimit,
    #[serde(rename = "exchange stop limit")]
    ExchangeStopLimit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewOrderRequest {
    pub symbol: String,
    pub amount: Decimal,
    pub price: Decimal,
    pub side: OrderSide,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_order_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_price: Option<Decimal>,
    /// Execution options such as `maker-or-cancel` or `immediate-or-cancel`
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

impl NewOrderRequest {
    pub fn limit(symbol: impl Into<String>, side: OrderSide, amount: Decimal, price: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            amount,
            price,
            side,
            order_type: OrderType::ExchangeLimit,
            client_order_id: None,
            stop_price: None,
            options: Vec::new(),
        }
    }

    pub fn with_client_order_id(mut self, client_order_id: impl Into<String>) -> Self {
        self.client_order_id = Some(client_order_id.into());
        self
    }

    pub fn with_option(mut self, option: impl Into<String>) -> Self {
        self.options.push(option.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OrderIdParams {
    pub order_id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PastTradesParams {
    pub symbol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_trades: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Ticker {
    pub bid: Decimal,
    pub ask: Decimal,
    pub last: Decimal,
    /// Per-currency volumes plus a `timestamp` key
    pub volume: Value,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OrderStatus {
    pub order_id: String,
    pub symbol: String,
    pub side: OrderSide,
    #[serde(rename = "type")]
    pub order_type: String,
    #[serde(default)]
    pub price: Option<Decimal>,
    pub avg_execution_price: Decimal,
    pub executed_amount: Decimal,
    pub remaining_amount: Decimal,
    pub original_amount: Decimal,
    pub is_live: bool,
    pub is_cancelled: bool,
    pub timestampms: u64,
    #[serde(default)]
    pub client_order_id: Option<String>,
    #[serde(default)]
    pub options: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Balance {
    #[serde(rename = "type")]
    pub account_type: String,
    pub currency: String,
    pub amount: Decimal,
    pub available: Decimal,
    pub available_for_withdrawal: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_market_params_only_supplied_flags() {
        assert!(MarketDataParams::default().query_pairs().is_empty());

        let params = MarketDataParams {
            heartbeat: Some(true),
            bids: Some(false),
            ..Default::default()
        };
        assert_eq!(
            params.query_pairs(),
            vec![("heartbeat", "true".to_string()), ("bids", "false".to_string())]
        );
    }

    #[test]
    fn test_order_events_filters() {
        let params = OrderEventsParams {
            symbol_filter: vec!["btcusd".to_string()],
            event_type_filter: vec!["fill".to_string(), "closed".to_string()],
            heartbeat: Some(true),
            ..Default::default()
        };
        assert_eq!(
            params.query_pairs(),
            vec![
                ("symbolFilter", "btcusd".to_string()),
                ("eventTypeFilter", "fill".to_string()),
                ("eventTypeFilter", "closed".to_string()),
                ("heartbeat", "true".to_string()),
            ]
        );
    }

    #[test]
    fn test_new_order_serializes_amounts_as_strings() {
        let order = NewOrderRequest::limit(
            "btcusd",
            OrderSide::Buy,
            Decimal::from_str("0.5").unwrap(),
            Decimal::from_str("30000.25").unwrap(),
        )
        .with_option("maker-or-cancel");
        let value = serde_json::to_value(&order).unwrap();
        assert_eq!(value["amount"], "0.5");
        assert_eq!(value["price"], "30000.25");
        assert_eq!(value["type"], "exchange limit");
        assert_eq!(value["options"][0], "maker-or-cancel");
        assert!(value.get("client_order_id").is_none());
    }

    #[test]
    fn test_balance_deserializes() {
        let balance: Balance = serde_json::from_str(
            r#"{"type":"exchange","currency":"BTC","amount":"1154.62034001","available":"1129.10517279","availableForWithdrawal":"1129.10517279"}"#,
        )
        .unwrap();
        assert_eq!(balance.currency, "BTC");
        assert_eq!(balance.available, Decimal::from_str("1129.10517279").unwrap());
    }
}
