use crate::call::{CallSpec, Upstream};
use crate::config::Config;
use crate::errors::{RpcRouterError, UpstreamError};
use http::header::{HeaderName, HeaderValue};
use http::StatusCode;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use url::Url;
use uuid::Uuid;

/// How much of an unparseable body is kept for diagnostics
const MAX_LOGGED_BODY_BYTES: usize = 512;

/// The caller's api key, forwarded verbatim. Redacted from debug output.
#[derive(Clone)]
pub struct Credential(HeaderValue);

impl Credential {
    pub fn new(api_key: &str) -> Result<Self, RpcRouterError> {
        let mut value = HeaderValue::from_str(api_key)
            .map_err(|_| RpcRouterError::InvalidRequest("Invalid apiKey".into()))?;
        value.set_sensitive(true);
        Ok(Self(value))
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: String,
    method: &'a str,
    params: &'a Value,
}

#[derive(Clone)]
struct LlmEndpoint {
    base_url: Url,
    api_key: String,
}

/// HTTP client for both upstreams.
///
/// Every call resolves to either the upstream's data or an `UpstreamError`
/// that says exactly which way the call failed.
#[derive(Clone)]
pub struct UpstreamClient {
    client: reqwest::Client,
    moz_url: Url,
    credential_header: HeaderName,
    llm: Option<LlmEndpoint>,
}

impl UpstreamClient {
    pub fn new(config: &Config) -> Result<Self, RpcRouterError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.limits.upstream_timeout_secs))
            .build()?;

        let credential_header = HeaderName::from_bytes(config.moz.credential_header.as_bytes())
            .map_err(|e| RpcRouterError::InternalError(format!("Invalid credential header: {e}")))?;

        let llm = config.llm.as_ref().map(|llm| {
            // Relative joins only keep the last path segment without a trailing slash
            let mut base_url = llm.url.clone();
            if !base_url.path().ends_with('/') {
                let path = format!("{}/", base_url.path());
                base_url.set_path(&path);
            }
            LlmEndpoint {
                base_url,
                api_key: llm.api_key.clone(),
            }
        });

        Ok(Self {
            client,
            moz_url: config.moz.url.clone(),
            credential_header,
            llm,
        })
    }

    pub async fn send(
        &self,
        call: &CallSpec,
        credential: Option<&Credential>,
    ) -> Result<Value, UpstreamError> {
        match call.upstream {
            Upstream::Moz => {
                self.send_rpc(&call.upstream_method, &call.payload, credential)
                    .await
            }
            Upstream::Llm => self.send_llm(&call.upstream_method, &call.payload).await,
        }
    }

    /// Issues one JSON-RPC 2.0 call and returns its `result`.
    async fn send_rpc(
        &self,
        method: &str,
        params: &Value,
        credential: Option<&Credential>,
    ) -> Result<Value, UpstreamError> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: Uuid::new_v4().to_string(),
            method,
            params,
        };

        let mut builder = self.client.post(self.moz_url.clone()).json(&request);
        if let Some(Credential(value)) = credential {
            builder = builder.header(self.credential_header.clone(), value.clone());
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        let mut envelope = parse_envelope(status, &body)?;
        Ok(envelope.remove("result").unwrap_or(Value::Null))
    }

    /// Posts a JSON payload to the LLM API and returns the whole response body.
    async fn send_llm(&self, path: &str, payload: &Value) -> Result<Value, UpstreamError> {
        let endpoint = self.llm.as_ref().ok_or(UpstreamError::NotConfigured("llm"))?;
        let url = endpoint.base_url.join(path)?;

        let response = self
            .client
            .post(url)
            .bearer_auth(&endpoint.api_key)
            .json(payload)
            .send()
            .await?;
        let status = response.status();
        let body = response.bytes().await?;

        parse_envelope(status, &body).map(Value::Object)
    }
}

/// Interprets an upstream body.
///
/// Non-JSON (or non-object) bodies are `Malformed` regardless of status. A
/// non-2xx status is `Status`, and a 2xx body carrying an `error` member is
/// `Rpc`. Both use `error.message` when present.
fn parse_envelope(
    status: StatusCode,
    body: &[u8],
) -> Result<serde_json::Map<String, Value>, UpstreamError> {
    let envelope = match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => map,
        Ok(_) | Err(_) => {
            let body = truncate_body(body);
            tracing::warn!(
                status = status.as_u16(),
                body = %body,
                "Upstream returned a body that is not a JSON object"
            );
            return Err(UpstreamError::Malformed {
                status: status.as_u16(),
                body,
            });
        }
    };

    let error = envelope.get("error").filter(|e| !e.is_null());
    let message = error.and_then(error_message);

    if !status.is_success() {
        return Err(UpstreamError::Status {
            status: status.as_u16(),
            message,
        });
    }

    if let Some(error) = error {
        return Err(UpstreamError::Rpc {
            code: error.get("code").and_then(Value::as_i64),
            message: message.unwrap_or_else(|| format!("Upstream returned status {}", status.as_u16())),
        });
    }

    Ok(envelope)
}

/// `{"error": {"message": "..."}}` or `{"error": "..."}`
fn error_message(error: &Value) -> Option<String> {
    match error {
        Value::String(message) => Some(message.clone()),
        Value::Object(map) => map
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
    .filter(|message| !message.is_empty())
}

fn truncate_body(body: &[u8]) -> String {
    let end = body.len().min(MAX_LOGGED_BODY_BYTES);
    String::from_utf8_lossy(&body[..end]).into_owned()
}
