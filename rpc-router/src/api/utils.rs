use crate::errors::RpcRouterError;
use crate::handler::Params;
use serde_json::{Value, json};

pub const DEFAULT_SCOPE: &str = "domain";
pub const DEFAULT_LOCALE: &str = "en-US";
pub const DEFAULT_DEVICE: &str = "desktop";
pub const DEFAULT_ENGINE: &str = "google";

/// Fallback and bounds for a `limit` option.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LimitRange {
    pub default: i64,
    pub min: i64,
    pub max: i64,
}

impl LimitRange {
    pub const fn new(default: i64, min: i64, max: i64) -> Self {
        Self { default, min, max }
    }

    /// Coerces a caller-supplied limit into range. Never rejects.
    ///
    /// Integers are clamped into `[min, max]`. JSON numbers are truncated and
    /// strings contribute their leading integer (`"12.5"` and `"12abc"` are
    /// 12). Anything else falls back to `default`.
    pub fn clamp(&self, value: Option<&Value>) -> i64 {
        let parsed = match value {
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64)),
            Some(Value::String(s)) => leading_integer(s),
            _ => None,
        };

        parsed.unwrap_or(self.default).clamp(self.min, self.max)
    }
}

fn leading_integer(s: &str) -> Option<i64> {
    let s = s.trim();
    let end = s
        .char_indices()
        .take_while(|&(i, c)| c.is_ascii_digit() || (i == 0 && (c == '-' || c == '+')))
        .map(|(i, c)| i + c.len_utf8())
        .last()?;
    s[..end].parse().ok()
}

/// Rewrites a bare domain to an https url. Values that already start with
/// `http` are returned unchanged (apart from surrounding whitespace).
pub fn normalize_url(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.starts_with("http") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    }
}

/// A required, non-empty list of strings.
pub fn string_list(params: &Params, key: &str) -> Result<Vec<String>, RpcRouterError> {
    let missing = || RpcRouterError::InvalidRequest(format!("Missing or empty {key} list"));

    let items = params
        .get(key)
        .and_then(Value::as_array)
        .filter(|items| !items.is_empty())
        .ok_or_else(missing)?;

    items
        .iter()
        .map(|item| match item.as_str() {
            Some(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
            _ => Err(RpcRouterError::InvalidRequest(format!(
                "Every entry in {key} must be a non-empty string"
            ))),
        })
        .collect()
}

/// An optional list of strings; absent or null means empty.
pub fn optional_string_list(params: &Params, key: &str) -> Result<Vec<String>, RpcRouterError> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(_) => string_list(params, key),
    }
}

pub fn required_string<'a>(params: &'a Params, key: &str) -> Result<&'a str, RpcRouterError> {
    params
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| RpcRouterError::InvalidRequest(format!("Missing {key}")))
}

/// The caller's string value for `key`, or `default` when absent, empty or
/// not a string.
pub fn string_or<'a>(params: &'a Params, key: &str, default: &'a str) -> &'a str {
    params
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(default)
}

/// Options shared by every call built from one request.
#[derive(Clone, Debug, PartialEq)]
pub struct SharedOptions {
    pub scope: String,
    pub locale: String,
    pub device: String,
    pub engine: String,
}

impl SharedOptions {
    pub fn from_params(params: &Params) -> Self {
        Self {
            scope: string_or(params, "scope", DEFAULT_SCOPE).to_string(),
            locale: string_or(params, "locale", DEFAULT_LOCALE).to_string(),
            device: string_or(params, "device", DEFAULT_DEVICE).to_string(),
            engine: string_or(params, "engine", DEFAULT_ENGINE).to_string(),
        }
    }

    pub fn site_query(&self, query: &str) -> Value {
        json!({ "query": query, "scope": self.scope })
    }

    pub fn serp_query(&self, keyword: &str) -> Value {
        json!({
            "keyword": keyword,
            "locale": self.locale,
            "device": self.device,
            "engine": self.engine,
        })
    }
}

pub fn page(limit: i64) -> Value {
    json!({ "n": 0, "limit": limit })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(value: Value) -> Params {
        match value {
            Value::Object(map) => map,
            _ => panic!("params must be an object"),
        }
    }

    #[test]
    fn test_clamp_limit() {
        let range = LimitRange::new(25, 1, 50);

        assert_eq!(range.clamp(None), 25);
        assert_eq!(range.clamp(Some(&json!(null))), 25);
        assert_eq!(range.clamp(Some(&json!("abc"))), 25);
        assert_eq!(range.clamp(Some(&json!(true))), 25);
        assert_eq!(range.clamp(Some(&json!(10))), 10);
        assert_eq!(range.clamp(Some(&json!("10"))), 10);
        assert_eq!(range.clamp(Some(&json!(" 12 "))), 12);
        assert_eq!(range.clamp(Some(&json!(12.9))), 12);
        assert_eq!(range.clamp(Some(&json!(0))), 1);
        assert_eq!(range.clamp(Some(&json!(-5))), 1);
        assert_eq!(range.clamp(Some(&json!(9999))), 50);
        assert_eq!(range.clamp(Some(&json!("9999"))), 50);

        // Strings truncate like numbers do
        assert_eq!(range.clamp(Some(&json!("12.5"))), 12);
        assert_eq!(range.clamp(Some(&json!("10abc"))), 10);
        assert_eq!(range.clamp(Some(&json!("-3"))), 1);
        assert_eq!(range.clamp(Some(&json!("-"))), 25);
        assert_eq!(range.clamp(Some(&json!(""))), 25);

        let wide = LimitRange::new(25, 1, 500);
        assert_eq!(wide.clamp(Some(&json!(9999))), 500);
        assert_eq!(wide.clamp(Some(&json!(300))), 300);
    }

    #[test]
    fn test_normalize_url() {
        assert_eq!(normalize_url("example.com"), "https://example.com");
        assert_eq!(normalize_url(" example.com/path "), "https://example.com/path");
        assert_eq!(normalize_url("https://example.com"), "https://example.com");
        assert_eq!(normalize_url("http://example.com"), "http://example.com");
    }

    #[test]
    fn test_string_list() {
        let p = params(json!({"targets": ["a.com", " b.com "]}));
        assert_eq!(string_list(&p, "targets").unwrap(), vec!["a.com", "b.com"]);

        let p = params(json!({"targets": []}));
        assert!(matches!(
            string_list(&p, "targets").unwrap_err(),
            RpcRouterError::InvalidRequest(_)
        ));

        let p = params(json!({"targets": "a.com"}));
        assert!(string_list(&p, "targets").is_err());

        let p = params(json!({"targets": ["a.com", 3]}));
        assert!(string_list(&p, "targets").is_err());

        let p = params(json!({}));
        assert!(string_list(&p, "targets").is_err());
        assert_eq!(optional_string_list(&p, "targets").unwrap(), Vec::<String>::new());
    }

    #[test]
    fn test_shared_options_defaults() {
        let options = SharedOptions::from_params(&params(json!({"locale": "de-DE", "device": ""})));
        assert_eq!(options.scope, DEFAULT_SCOPE);
        assert_eq!(options.locale, "de-DE");
        assert_eq!(options.device, DEFAULT_DEVICE);
        assert_eq!(options.engine, DEFAULT_ENGINE);
    }
}
