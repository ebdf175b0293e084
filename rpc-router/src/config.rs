use http::HeaderValue;
use http::header::HeaderName;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::Semaphore;
use url::Url;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("Endpoint path must start with '/': {0}")]
    InvalidEndpointPath(String),

    #[error("Allowed CORS origin is not a valid header value: {0:?}")]
    InvalidAllowedOrigin(String),

    #[error("Credential header is not a valid header name: {0:?}")]
    InvalidCredentialHeader(String),

    #[error("LLM url cannot be used as a base url: {0}")]
    InvalidLlmUrl(Url),

    #[error("LLM api key is empty")]
    EmptyLlmApiKey,

    #[error("max_concurrent_calls must be at least 1")]
    ZeroConcurrency,

    #[error("max_concurrent_calls cannot exceed {max}: {0}", max = Semaphore::MAX_PERMITS)]
    TooManyConcurrentCalls(usize),

    #[error("max_batch_items must be at least 1 when set")]
    ZeroBatchItems,

    #[error("upstream_timeout_secs must be at least 1")]
    ZeroTimeout,
}

/// RPC router configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    /// Main listener serving the RPC endpoint
    pub listener: Listener,
    /// Admin listener for health and readiness checks
    pub admin_listener: Listener,
    /// Path of the single RPC endpoint
    #[serde(default = "default_endpoint_path")]
    pub endpoint_path: String,
    pub cors: CorsConfig,
    #[serde(default)]
    pub moz: MozConfig,
    /// LLM methods are only registered when this section is present
    #[serde(default)]
    pub llm: Option<LlmConfig>,
    #[serde(default)]
    pub limits: Limits,
}

impl Config {
    /// Validates the router configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()?;
        self.admin_listener.validate()?;

        if !self.endpoint_path.starts_with('/') {
            return Err(ValidationError::InvalidEndpointPath(
                self.endpoint_path.clone(),
            ));
        }

        self.cors.validate()?;
        self.moz.validate()?;
        if let Some(llm) = &self.llm {
            llm.validate()?;
        }
        self.limits.validate()?;

        Ok(())
    }
}

fn default_endpoint_path() -> String {
    "/".to_string()
}

/// Network listener configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    /// Host address to bind to (e.g., "0.0.0.0" or "127.0.0.1")
    pub host: String,
    /// Port number to listen on
    pub port: u16,
}

impl Listener {
    /// Validates the listener configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        Ok(())
    }
}

/// The single browser origin allowed to call the endpoint
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct CorsConfig {
    pub allowed_origin: String,
}

impl CorsConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.allowed_origin.is_empty()
            || HeaderValue::from_str(&self.allowed_origin).is_err()
        {
            return Err(ValidationError::InvalidAllowedOrigin(
                self.allowed_origin.clone(),
            ));
        }
        Ok(())
    }
}

/// Moz JSON-RPC upstream
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct MozConfig {
    pub url: Url,
    /// Header carrying the caller's api key, forwarded verbatim
    pub credential_header: String,
}

impl Default for MozConfig {
    fn default() -> Self {
        Self {
            url: Url::parse("https://api.moz.com/jsonrpc").expect("static url is valid"),
            credential_header: "x-moz-token".to_string(),
        }
    }
}

impl MozConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        HeaderName::from_bytes(self.credential_header.as_bytes()).map_err(|_| {
            ValidationError::InvalidCredentialHeader(self.credential_header.clone())
        })?;
        Ok(())
    }
}

/// OpenAI-compatible LLM upstream. Calls use the server-side key.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct LlmConfig {
    /// Base url, e.g. `https://api.openai.com/v1/`
    pub url: Url,
    pub api_key: String,
    #[serde(default = "default_chat_model")]
    pub chat_model: String,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
}

impl LlmConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.url.cannot_be_a_base() {
            return Err(ValidationError::InvalidLlmUrl(self.url.clone()));
        }
        if self.api_key.is_empty() {
            return Err(ValidationError::EmptyLlmApiKey);
        }
        Ok(())
    }
}

fn default_chat_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

/// Resource bounds for upstream fan-out
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct Limits {
    /// Upper bound on upstream calls in flight across all requests
    pub max_concurrent_calls: usize,
    /// Optional ceiling on the length of target/keyword lists. Unbounded when unset.
    pub max_batch_items: Option<usize>,
    /// Transport timeout applied to every upstream call
    pub upstream_timeout_secs: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_concurrent_calls: 16,
            max_batch_items: None,
            upstream_timeout_secs: 30,
        }
    }
}

impl Limits {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_concurrent_calls == 0 {
            return Err(ValidationError::ZeroConcurrency);
        }
        if self.max_concurrent_calls > Semaphore::MAX_PERMITS {
            return Err(ValidationError::TooManyConcurrentCalls(
                self.max_concurrent_calls,
            ));
        }
        if self.max_batch_items == Some(0) {
            return Err(ValidationError::ZeroBatchItems);
        }
        if self.upstream_timeout_secs == 0 {
            return Err(ValidationError::ZeroTimeout);
        }
        Ok(())
    }
}
