use crate::core::errors::GeminiError;
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::Value;
use tracing::{instrument, trace};

/// REST transport used by the endpoint layer.
///
/// Authentication headers are computed by the caller and passed through
/// verbatim; this layer never sees credentials.
#[async_trait]
pub trait RestClient: Send + Sync {
    /// Make a public GET request
    async fn get(&self, endpoint: &str, query_params: &[(&str, &str)]) -> Result<Value, GeminiError>;

    /// Make a POST request with pre-computed headers
    async fn post(
        &self,
        endpoint: &str,
        headers: &[(String, String)],
        body: &[u8],
    ) -> Result<Value, GeminiError>;
}

/// Configuration for the REST client
#[derive(Clone, Debug)]
pub struct RestClientConfig {
    /// Base URL for the API
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// User agent string to include in requests
    pub user_agent: String,
}

impl RestClientConfig {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            timeout_seconds: 30,
            user_agent: concat!("gemini-api/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }

    pub fn with_timeout(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }

    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }
}

/// Error body returned by the exchange on failed calls
#[derive(Debug, Deserialize)]
struct ErrorBody {
    reason: String,
    message: String,
}

/// Implementation of `RestClient` using reqwest
#[derive(Clone)]
pub struct ReqwestRest {
    client: Client,
    config: RestClientConfig,
}

impl std::fmt::Debug for ReqwestRest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestRest")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ReqwestRest {
    pub fn new(config: RestClientConfig) -> Result<Self, GeminiError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self { client, config })
    }

    fn build_url(&self, endpoint: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), endpoint)
    }

    #[instrument(skip(self, response), fields(status = %response.status()))]
    async fn handle_response(&self, response: Response) -> Result<Value, GeminiError> {
        let status = response.status();
        let response_text = response.text().await?;

        trace!("Response body: {}", response_text);

        if status.is_success() {
            return Ok(serde_json::from_str(&response_text)?);
        }

        Err(parse_error_body(status.as_u16(), &response_text))
    }
}

/// Surface the server-provided reason and message, or the raw body if the
/// error is not in the usual shape.
pub fn parse_error_body(status: u16, body: &str) -> GeminiError {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(error) => GeminiError::Api {
            reason: error.reason,
            message: error.message,
        },
        Err(_) => GeminiError::Api {
            reason: format!("HTTP {}", status),
            message: body.to_string(),
        },
    }
}

#[async_trait]
impl RestClient for ReqwestRest {
    #[instrument(skip(self, query_params), fields(endpoint = %endpoint, param_count = query_params.len()))]
    async fn get(&self, endpoint: &str, query_params: &[(&str, &str)]) -> Result<Value, GeminiError> {
        let response = self
            .client
            .get(self.build_url(endpoint))
            .query(query_params)
            .send()
            .await?;

        self.handle_response(response).await
    }

    #[instrument(skip(self, headers, body), fields(endpoint = %endpoint))]
    async fn post(
        &self,
        endpoint: &str,
        headers: &[(String, String)],
        body: &[u8],
    ) -> Result<Value, GeminiError> {
        let mut request = self.client.post(self.build_url(endpoint));
        for (key, value) in headers {
            request = request.header(key.as_str(), value.as_str());
        }

        let response = request.body(body.to_vec()).send().await?;
        self.handle_response(response).await
    }
}
