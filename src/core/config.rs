use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::env;

pub const PRODUCTION_REST_URL: &str = "https://api.gemini.com";
pub const PRODUCTION_WS_URL: &str = "wss://api.gemini.com";
pub const SANDBOX_REST_URL: &str = "https://api.sandbox.gemini.com";
pub const SANDBOX_WS_URL: &str = "wss://api.sandbox.gemini.com";
pub const DEFAULT_SYMBOL: &str = "btcusd";

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Secret<String>,
    pub secret_key: Secret<String>,
    pub sandbox: bool,
    pub base_url: Option<String>,
    pub ws_url: Option<String>,
    pub default_symbol: String,
    /// Sub-account name, only meaningful for master API keys
    pub account: Option<String>,
}

// Custom Serialize implementation - never expose secrets in serialization
impl Serialize for GeminiConfig {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("GeminiConfig", 7)?;
        state.serialize_field("api_key", "[REDACTED]")?;
        state.serialize_field("secret_key", "[REDACTED]")?;
        state.serialize_field("sandbox", &self.sandbox)?;
        state.serialize_field("base_url", &self.base_url)?;
        state.serialize_field("ws_url", &self.ws_url)?;
        state.serialize_field("default_symbol", &self.default_symbol)?;
        state.serialize_field("account", &self.account)?;
        state.end()
    }
}

impl<'de> Deserialize<'de> for GeminiConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct GeminiConfigHelper {
            #[serde(default)]
            api_key: String,
            #[serde(default)]
            secret_key: String,
            #[serde(default)]
            sandbox: bool,
            base_url: Option<String>,
            ws_url: Option<String>,
            default_symbol: Option<String>,
            account: Option<String>,
        }

        let helper = GeminiConfigHelper::deserialize(deserializer)?;
        Ok(Self {
            api_key: Secret::new(helper.api_key),
            secret_key: Secret::new(helper.secret_key),
            sandbox: helper.sandbox,
            base_url: helper.base_url,
            ws_url: helper.ws_url,
            default_symbol: helper
                .default_symbol
                .unwrap_or_else(|| DEFAULT_SYMBOL.to_string()),
            account: helper.account,
        })
    }
}

impl GeminiConfig {
    /// Create a new configuration with API credentials
    #[must_use]
    pub fn new(api_key: String, secret_key: String) -> Self {
        Self {
            api_key: Secret::new(api_key),
            secret_key: Secret::new(secret_key),
            sandbox: false,
            base_url: None,
            ws_url: None,
            default_symbol: DEFAULT_SYMBOL.to_string(),
            account: None,
        }
    }

    /// Create configuration from environment variables
    ///
    /// Expected environment variables:
    /// - `{PREFIX}_API_KEY` (e.g., `GEMINI_API_KEY`)
    /// - `{PREFIX}_SECRET_KEY` (e.g., `GEMINI_SECRET_KEY`)
    /// - `{PREFIX}_SANDBOX` (optional, defaults to false)
    /// - `{PREFIX}_BASE_URL`, `{PREFIX}_WS_URL` (optional host overrides)
    /// - `{PREFIX}_SYMBOL` (optional default market symbol)
    /// - `{PREFIX}_ACCOUNT` (optional sub-account name)
    pub fn from_env(prefix: &str) -> Result<Self, ConfigError> {
        let prefix = prefix.to_uppercase();
        let api_key_var = format!("{}_API_KEY", prefix);
        let secret_key_var = format!("{}_SECRET_KEY", prefix);

        let api_key = env::var(&api_key_var)
            .map_err(|_| ConfigError::MissingEnvironmentVariable(api_key_var))?;

        let secret_key = env::var(&secret_key_var)
            .map_err(|_| ConfigError::MissingEnvironmentVariable(secret_key_var))?;

        let sandbox_var = format!("{}_SANDBOX", prefix);
        let sandbox = match env::var(&sandbox_var) {
            Ok(value) => value.parse::<bool>().map_err(|_| {
                ConfigError::InvalidConfiguration(format!(
                    "{} must be 'true' or 'false', got '{}'",
                    sandbox_var, value
                ))
            })?,
            Err(_) => false,
        };

        Ok(Self {
            api_key: Secret::new(api_key),
            secret_key: Secret::new(secret_key),
            sandbox,
            base_url: env::var(format!("{}_BASE_URL", prefix)).ok(),
            ws_url: env::var(format!("{}_WS_URL", prefix)).ok(),
            default_symbol: env::var(format!("{}_SYMBOL", prefix))
                .unwrap_or_else(|_| DEFAULT_SYMBOL.to_string()),
            account: env::var(format!("{}_ACCOUNT", prefix)).ok(),
        })
    }

    /// Create configuration from a `.env` file and environment variables
    ///
    /// **Security Warning**: Never commit .env files to version control!
    #[cfg(feature = "env-file")]
    pub fn from_env_file(prefix: &str) -> Result<Self, ConfigError> {
        Self::from_env_file_with_path(prefix, ".env")
    }

    /// Create configuration from a specific `.env` file path
    #[cfg(feature = "env-file")]
    pub fn from_env_file_with_path(prefix: &str, env_file_path: &str) -> Result<Self, ConfigError> {
        match dotenv::from_path(env_file_path) {
            Ok(()) => {}
            Err(dotenv::Error::Io(io_err)) if io_err.kind() == std::io::ErrorKind::NotFound => {
                // No file, fall through to the process environment
            }
            Err(e) => {
                return Err(ConfigError::InvalidConfiguration(format!(
                    "Failed to load .env file '{}': {}",
                    env_file_path, e
                )));
            }
        }

        Self::from_env(prefix)
    }

    /// Configuration for public market data only
    #[must_use]
    pub fn read_only() -> Self {
        Self::new(String::new(), String::new())
    }

    /// Both key and secret are present
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        !self.api_key.expose_secret().is_empty() && !self.secret_key.expose_secret().is_empty()
    }

    /// Name the first missing credential, if any
    pub fn missing_credential(&self) -> Option<&'static str> {
        if self.api_key.expose_secret().is_empty() {
            Some("api key")
        } else if self.secret_key.expose_secret().is_empty() {
            Some("api secret")
        } else {
            None
        }
    }

    #[must_use]
    pub const fn sandbox(mut self, sandbox: bool) -> Self {
        self.sandbox = sandbox;
        self
    }

    #[must_use]
    pub fn base_url(mut self, base_url: String) -> Self {
        self.base_url = Some(base_url);
        self
    }

    #[must_use]
    pub fn ws_url(mut self, ws_url: String) -> Self {
        self.ws_url = Some(ws_url);
        self
    }

    #[must_use]
    pub fn default_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.default_symbol = symbol.into();
        self
    }

    #[must_use]
    pub fn account(mut self, account: impl Into<String>) -> Self {
        self.account = Some(account.into());
        self
    }

    /// REST host: explicit override, else sandbox or production
    pub fn rest_url(&self) -> &str {
        match (&self.base_url, self.sandbox) {
            (Some(url), _) => url,
            (None, true) => SANDBOX_REST_URL,
            (None, false) => PRODUCTION_REST_URL,
        }
    }

    /// WebSocket host: explicit override, else sandbox or production
    pub fn websocket_url(&self) -> &str {
        match (&self.ws_url, self.sandbox) {
            (Some(url), _) => url,
            (None, true) => SANDBOX_WS_URL,
            (None, false) => PRODUCTION_WS_URL,
        }
    }

    /// Get API key (use carefully - exposes secret)
    pub fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }

    /// Get secret key (use carefully - exposes secret)
    pub fn secret_key(&self) -> &str {
        self.secret_key.expose_secret()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvironmentVariable(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}
