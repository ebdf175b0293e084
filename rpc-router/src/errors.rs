use crate::config::ValidationError;
use http::StatusCode;
use thiserror::Error;

/// Request-level errors. Anything in here turns into a non-200 response.
#[derive(Error, Debug)]
pub enum RpcRouterError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("Unknown method: {0}")]
    InvalidMethod(String),

    #[error("Failed to read request body: {0}")]
    RequestBodyError(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ValidationError),

    #[error("HTTP client error: {0}")]
    HttpClientError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RpcRouterError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RpcRouterError::InvalidRequest(_)
            | RpcRouterError::InvalidMethod(_)
            | RpcRouterError::RequestBodyError(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message returned to the caller. Server-side failures never expose details.
    pub fn public_message(&self) -> String {
        match self.status_code() {
            StatusCode::BAD_REQUEST => self.to_string(),
            _ => "Internal server error".to_string(),
        }
    }
}

/// Failure of a single upstream call. These never fail the whole request; they
/// become an error outcome in the response array.
#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid upstream endpoint: {0}")]
    InvalidEndpoint(#[from] url::ParseError),

    #[error("{0} upstream is not configured")]
    NotConfigured(&'static str),

    /// The body could not be parsed as the expected JSON envelope.
    /// `body` holds a truncated copy for diagnostics only.
    #[error("malformed upstream response (status {status})")]
    Malformed { status: u16, body: String },

    #[error("upstream returned status {status}")]
    Status { status: u16, message: Option<String> },

    #[error("upstream error: {message}")]
    Rpc { code: Option<i64>, message: String },
}

impl UpstreamError {
    /// The reason reported to the caller in the error outcome.
    pub fn reason(&self) -> String {
        match self {
            UpstreamError::Transport(_)
            | UpstreamError::InvalidEndpoint(_)
            | UpstreamError::NotConfigured(_) => "Upstream request failed".to_string(),
            UpstreamError::Malformed { .. } => "Invalid response from upstream API".to_string(),
            UpstreamError::Status {
                message: Some(message),
                ..
            } => message.clone(),
            UpstreamError::Status {
                status,
                message: None,
            } => format!("Upstream returned status {status}"),
            UpstreamError::Rpc { message, .. } => message.clone(),
        }
    }

    /// Short label used as a metric tag.
    pub fn kind(&self) -> &'static str {
        match self {
            UpstreamError::Transport(_) => "transport",
            UpstreamError::InvalidEndpoint(_) | UpstreamError::NotConfigured(_) => "endpoint",
            UpstreamError::Malformed { .. } => "malformed",
            UpstreamError::Status { .. } => "status",
            UpstreamError::Rpc { .. } => "rpc",
        }
    }
}
