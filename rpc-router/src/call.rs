//! Call descriptors and their settled outcomes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which upstream a call is sent to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Upstream {
    /// Moz JSON-RPC endpoint, authenticated with the caller's api key
    Moz,
    /// LLM API, authenticated with the server-side key
    Llm,
}

impl Upstream {
    pub fn as_str(&self) -> &'static str {
        match self {
            Upstream::Moz => "moz",
            Upstream::Llm => "llm",
        }
    }
}

/// One fully-formed upstream call.
///
/// For `Upstream::Moz` the method is the JSON-RPC method name, for
/// `Upstream::Llm` it is the path relative to the configured base url.
#[derive(Clone, Debug, PartialEq)]
pub struct CallSpec {
    pub upstream: Upstream,
    pub upstream_method: String,
    pub payload: Value,
}

impl CallSpec {
    pub fn moz(method: &str, payload: Value) -> Self {
        Self {
            upstream: Upstream::Moz,
            upstream_method: method.to_string(),
            payload,
        }
    }

    pub fn llm(path: &str, payload: Value) -> Self {
        Self {
            upstream: Upstream::Llm,
            upstream_method: path.to_string(),
            payload,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchMode {
    /// Exactly one upstream call, awaited inline
    SingleShot,
    /// One call per list item, executed in parallel
    FanOut,
}

/// Ordered calls derived from one inbound request. Outcomes are reported in
/// the same order.
#[derive(Clone, Debug, PartialEq)]
pub struct Batch {
    pub mode: DispatchMode,
    pub calls: Vec<CallSpec>,
}

impl Batch {
    pub fn single(call: CallSpec) -> Self {
        Self {
            mode: DispatchMode::SingleShot,
            calls: vec![call],
        }
    }

    pub fn fan_out(calls: Vec<CallSpec>) -> Self {
        Self {
            mode: DispatchMode::FanOut,
            calls,
        }
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// True if any call goes to an upstream that needs the caller's api key.
    pub fn requires_credential(&self) -> bool {
        self.calls.iter().any(|call| call.upstream == Upstream::Moz)
    }
}

/// Settled result of one call, serialized as
/// `{"status":"success","data":…}` or `{"status":"error","reason":"…"}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Outcome {
    Success { data: Value },
    Error { reason: String },
}

impl Outcome {
    pub fn success(data: Value) -> Self {
        Outcome::Success { data }
    }

    pub fn error(reason: impl Into<String>) -> Self {
        Outcome::Error {
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }
}
