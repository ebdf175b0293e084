//! Single-call methods forwarded to the LLM API.

use super::utils::string_or;
use crate::call::{CallSpec, DispatchMode, Upstream};
use crate::errors::RpcRouterError;
use crate::handler::{Method, Params};
use serde_json::{Map, Value};

pub struct LlmChat {
    default_model: String,
}

impl LlmChat {
    pub fn new(default_model: String) -> Self {
        Self { default_model }
    }
}

impl Method for LlmChat {
    fn name(&self) -> &'static str {
        "llmChat"
    }

    fn dispatch_mode(&self) -> DispatchMode {
        DispatchMode::SingleShot
    }

    fn upstream(&self) -> Upstream {
        Upstream::Llm
    }

    fn build_calls(&self, params: &Params) -> Result<Vec<CallSpec>, RpcRouterError> {
        let messages = params
            .get("messages")
            .and_then(Value::as_array)
            .filter(|messages| !messages.is_empty())
            .ok_or_else(|| RpcRouterError::InvalidRequest("Missing messages".into()))?;

        let mut payload = Map::new();
        payload.insert(
            "model".into(),
            string_or(params, "model", &self.default_model).into(),
        );
        payload.insert("messages".into(), Value::Array(messages.clone()));
        if let Some(temperature) = params.get("temperature").filter(|t| t.is_number()) {
            payload.insert("temperature".into(), temperature.clone());
        }

        Ok(vec![CallSpec::llm("chat/completions", Value::Object(payload))])
    }
}

pub struct LlmEmbedding {
    default_model: String,
}

impl LlmEmbedding {
    pub fn new(default_model: String) -> Self {
        Self { default_model }
    }
}

impl Method for LlmEmbedding {
    fn name(&self) -> &'static str {
        "llmEmbedding"
    }

    fn dispatch_mode(&self) -> DispatchMode {
        DispatchMode::SingleShot
    }

    fn upstream(&self) -> Upstream {
        Upstream::Llm
    }

    fn build_calls(&self, params: &Params) -> Result<Vec<CallSpec>, RpcRouterError> {
        let input = match params.get("input") {
            Some(Value::String(s)) if !s.is_empty() => Value::from(s.as_str()),
            Some(Value::Array(items)) if !items.is_empty() => Value::Array(items.clone()),
            _ => return Err(RpcRouterError::InvalidRequest("Missing input".into())),
        };

        let mut payload = Map::new();
        payload.insert(
            "model".into(),
            string_or(params, "model", &self.default_model).into(),
        );
        payload.insert("input".into(), input);

        Ok(vec![CallSpec::llm("embeddings", Value::Object(payload))])
    }
}
