use crate::core::config::GeminiConfig;
use crate::core::errors::GeminiError;
use crate::core::kernel::nonce::{EpochMillis, NonceProvider};
use crate::core::kernel::rest::RestClient;
use crate::core::kernel::signer::{HmacSigner, Signer};
use crate::gemini::types::{
    AccountScoped, Balance, NewOrderRequest, OrderIdParams, OrderStatus, PastTradesParams, Ticker,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::instrument;

const SYMBOLS: &str = "/v1/symbols";
const SYMBOL_DETAILS: &str = "/v1/symbols/details";
const TICKER: &str = "/v1/pubticker";
const ORDER_BOOK: &str = "/v1/book";
const TRADES: &str = "/v1/trades";

const NEW_ORDER: &str = "/v1/order/new";
const CANCEL_ORDER: &str = "/v1/order/cancel";
const CANCEL_SESSION: &str = "/v1/order/cancel/session";
const CANCEL_ALL: &str = "/v1/order/cancel/all";
const ORDER_STATUS: &str = "/v1/order/status";
const ACTIVE_ORDERS: &str = "/v1/orders";
const PAST_TRADES: &str = "/v1/mytrades";
const BALANCES: &str = "/v1/balances";
const HEARTBEAT: &str = "/v1/heartbeat";

/// REST side of the client.
///
/// Private calls carry their parameters in the signed payload header and send
/// an empty body.
pub struct GeminiRest<R: RestClient> {
    rest: R,
    signer: Option<HmacSigner>,
    nonce: Arc<dyn NonceProvider>,
    account: Option<String>,
}

impl<R: RestClient> GeminiRest<R> {
    pub fn new(rest: R, config: &GeminiConfig) -> Self {
        let signer = config.has_credentials().then(|| {
            HmacSigner::new(config.api_key().to_string(), config.secret_key().to_string())
        });
        Self {
            rest,
            signer,
            nonce: Arc::new(EpochMillis),
            account: config.account.clone(),
        }
    }

    pub fn with_nonce_provider(mut self, provider: impl NonceProvider + 'static) -> Self {
        self.nonce = Arc::new(provider);
        self
    }

    pub(crate) fn with_shared_nonce(mut self, provider: Arc<dyn NonceProvider>) -> Self {
        self.nonce = provider;
        self
    }

    pub fn can_sign(&self) -> bool {
        self.signer.is_some()
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, GeminiError> {
        let value = self.rest.get(endpoint, &[]).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn post_signed<P, T>(&self, endpoint: &str, params: P) -> Result<T, GeminiError>
    where
        P: Serialize + Send,
        T: DeserializeOwned,
    {
        let signer = self.signer.as_ref().ok_or_else(|| {
            GeminiError::MissingCredentials(format!("api key and secret required for {}", endpoint))
        })?;

        let scoped = AccountScoped {
            params,
            account: self.account.as_deref(),
        };
        let auth = signer.sign_request(endpoint, self.nonce.nonce(), scoped)?;

        let mut headers = vec![
            ("Content-Type".to_string(), "text/plain".to_string()),
            ("Cache-Control".to_string(), "no-cache".to_string()),
        ];
        headers.extend(auth.to_pairs());

        let value = self.rest.post(endpoint, &headers, &[]).await?;
        Ok(serde_json::from_value(value)?)
    }

    // Public market data

    #[instrument(skip(self))]
    pub async fn symbols(&self) -> Result<Vec<String>, GeminiError> {
        self.get_json(SYMBOLS).await
    }

    #[instrument(skip(self))]
    pub async fn symbol_details(&self, symbol: &str) -> Result<Value, GeminiError> {
        self.get_json(&format!("{}/{}", SYMBOL_DETAILS, symbol)).await
    }

    #[instrument(skip(self))]
    pub async fn ticker(&self, symbol: &str) -> Result<Ticker, GeminiError> {
        self.get_json(&format!("{}/{}", TICKER, symbol)).await
    }

    #[instrument(skip(self))]
    pub async fn order_book(&self, symbol: &str) -> Result<Value, GeminiError> {
        self.get_json(&format!("{}/{}", ORDER_BOOK, symbol)).await
    }

    #[instrument(skip(self))]
    pub async fn trade_history(&self, symbol: &str) -> Result<Value, GeminiError> {
        self.get_json(&format!("{}/{}", TRADES, symbol)).await
    }

    // Orders

    #[instrument(skip(self, order), fields(symbol = %order.symbol, side = ?order.side))]
    pub async fn new_order(&self, order: &NewOrderRequest) -> Result<OrderStatus, GeminiError> {
        self.post_signed(NEW_ORDER, order).await
    }

    #[instrument(skip(self))]
    pub async fn cancel_order(&self, order_id: u64) -> Result<OrderStatus, GeminiError> {
        self.post_signed(CANCEL_ORDER, OrderIdParams { order_id }).await
    }

    /// Cancel every order placed by this API session
    #[instrument(skip(self))]
    pub async fn cancel_all_session_orders(&self) -> Result<Value, GeminiError> {
        self.post_signed(CANCEL_SESSION, ()).await
    }

    /// Cancel every active order on the account, across sessions
    #[instrument(skip(self))]
    pub async fn cancel_all_active_orders(&self) -> Result<Value, GeminiError> {
        self.post_signed(CANCEL_ALL, ()).await
    }

    #[instrument(skip(self))]
    pub async fn order_status(&self, order_id: u64) -> Result<OrderStatus, GeminiError> {
        self.post_signed(ORDER_STATUS, OrderIdParams { order_id }).await
    }

    #[instrument(skip(self))]
    pub async fn active_orders(&self) -> Result<Vec<OrderStatus>, GeminiError> {
        self.post_signed(ACTIVE_ORDERS, ()).await
    }

    #[instrument(skip(self, params), fields(symbol = %params.symbol))]
    pub async fn past_trades(&self, params: &PastTradesParams) -> Result<Value, GeminiError> {
        self.post_signed(PAST_TRADES, params).await
    }

    // Account

    #[instrument(skip(self))]
    pub async fn balances(&self) -> Result<Vec<Balance>, GeminiError> {
        self.post_signed(BALANCES, ()).await
    }

    /// Keep session orders alive when the account requires heartbeats
    #[instrument(skip(self))]
    pub async fn heartbeat(&self) -> Result<Value, GeminiError> {
        self.post_signed(HEARTBEAT, ()).await
    }
}
