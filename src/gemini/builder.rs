use crate::core::config::GeminiConfig;
use crate::core::errors::GeminiError;
use crate::core::kernel::nonce::{EpochMillis, NonceProvider};
use crate::core::kernel::rest::{ReqwestRest, RestClientConfig};
use crate::core::kernel::transport::{TungsteniteTransport, WsConfig};
use crate::gemini::client::GeminiClient;
use crate::gemini::rest::GeminiRest;
use crate::gemini::websocket::GeminiWs;
use std::sync::Arc;
use std::time::Duration;

/// Builder for Gemini clients
///
/// REST and WebSocket halves built from the same builder share one nonce
/// provider, so nonces stay increasing across both.
pub struct GeminiBuilder {
    config: GeminiConfig,
    nonce: Arc<dyn NonceProvider>,
    rest_timeout: u64,
    user_agent: Option<String>,
    ws_config: WsConfig,
}

impl Default for GeminiBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GeminiBuilder {
    /// Public-data builder pointing at production
    pub fn new() -> Self {
        Self {
            config: GeminiConfig::read_only(),
            nonce: Arc::new(EpochMillis),
            rest_timeout: 30,
            user_agent: None,
            ws_config: WsConfig::default(),
        }
    }

    pub fn with_config(mut self, config: GeminiConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_credentials(mut self, api_key: String, secret_key: String) -> Self {
        let previous = std::mem::replace(&mut self.config, GeminiConfig::new(api_key, secret_key));
        self.config.sandbox = previous.sandbox;
        self.config.base_url = previous.base_url;
        self.config.ws_url = previous.ws_url;
        self.config.default_symbol = previous.default_symbol;
        self.config.account = previous.account;
        self
    }

    pub fn with_sandbox(mut self, sandbox: bool) -> Self {
        self.config.sandbox = sandbox;
        self
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.config.base_url = Some(base_url);
        self
    }

    pub fn with_ws_url(mut self, ws_url: String) -> Self {
        self.config.ws_url = Some(ws_url);
        self
    }

    pub fn with_nonce_provider(mut self, provider: impl NonceProvider + 'static) -> Self {
        self.nonce = Arc::new(provider);
        self
    }

    /// Set REST client timeout in seconds
    pub fn with_rest_timeout(mut self, timeout: u64) -> Self {
        self.rest_timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = Some(user_agent);
        self
    }

    /// Abort WebSocket handshakes that take longer than `timeout`
    pub fn with_ws_connect_timeout(mut self, timeout: Duration) -> Self {
        self.ws_config.connect_timeout = Some(timeout);
        self
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    /// Build the REST half only
    pub fn build_rest(&self) -> Result<GeminiRest<ReqwestRest>, GeminiError> {
        let mut rest_config = RestClientConfig::new(self.config.rest_url().to_string())
            .with_timeout(self.rest_timeout);
        if let Some(user_agent) = &self.user_agent {
            rest_config = rest_config.with_user_agent(user_agent.clone());
        }

        let rest = ReqwestRest::new(rest_config)?;
        Ok(GeminiRest::new(rest, &self.config).with_shared_nonce(Arc::clone(&self.nonce)))
    }

    /// Build the WebSocket half only
    pub fn build_ws(&self) -> GeminiWs<TungsteniteTransport> {
        let transport = TungsteniteTransport::new().with_config(self.ws_config.clone());
        GeminiWs::with_transport(self.config.clone(), transport)
            .with_shared_nonce(Arc::clone(&self.nonce))
    }

    pub fn build(self) -> Result<GeminiClient, GeminiError> {
        let rest = self.build_rest()?;
        let ws = self.build_ws();
        Ok(GeminiClient::new(rest, ws))
    }
}
