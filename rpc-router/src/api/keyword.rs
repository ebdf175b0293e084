//! Methods that fan out over a list of keywords.

use super::utils::{LimitRange, SharedOptions, page, string_list};
use crate::call::{CallSpec, DispatchMode};
use crate::errors::RpcRouterError;
use crate::handler::{Method, Params};
use serde_json::{Value, json};

const SUGGESTIONS_LIMIT: LimitRange = LimitRange::new(25, 1, 500);

/// One call per entry of `params.keywords`, each carrying a full serp query
/// (keyword, locale, device, engine).
pub struct KeywordListMethod {
    name: &'static str,
    upstream_method: &'static str,
    limit: Option<LimitRange>,
}

impl KeywordListMethod {
    pub fn keyword_metrics() -> Self {
        Self {
            name: "keywordMetrics",
            upstream_method: "data.keyword.metrics.fetch",
            limit: None,
        }
    }

    pub fn keyword_suggestions() -> Self {
        Self {
            name: "keywordSuggestions",
            upstream_method: "data.keyword.suggestions.list",
            limit: Some(SUGGESTIONS_LIMIT),
        }
    }

    pub fn search_intent() -> Self {
        Self {
            name: "searchIntent",
            upstream_method: "data.keyword.search.intent.fetch",
            limit: None,
        }
    }

    fn payload(&self, keyword: &str, options: &SharedOptions, params: &Params) -> Value {
        let mut payload = json!({ "data": { "serp_query": options.serp_query(keyword) } });
        if let Some(range) = self.limit {
            payload["data"]["page"] = page(range.clamp(params.get("limit")));
        }
        payload
    }
}

impl Method for KeywordListMethod {
    fn name(&self) -> &'static str {
        self.name
    }

    fn dispatch_mode(&self) -> DispatchMode {
        DispatchMode::FanOut
    }

    fn build_calls(&self, params: &Params) -> Result<Vec<CallSpec>, RpcRouterError> {
        let keywords = string_list(params, "keywords")?;
        let options = SharedOptions::from_params(params);

        Ok(keywords
            .iter()
            .map(|keyword| {
                CallSpec::moz(self.upstream_method, self.payload(keyword, &options, params))
            })
            .collect())
    }
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
    fn test_keyword_metrics_defaults() {
        let calls = KeywordListMethod::keyword_metrics()
            .build_calls(&params(json!({"keywords": ["seo tools", "backlinks"]})))
            .unwrap();

        assert_eq!(calls.len(), 2);
        assert_eq!(
            calls[0].payload,
            json!({
                "data": {
                    "serp_query": {
                        "keyword": "seo tools",
                        "locale": "en-US",
                        "device": "desktop",
                        "engine": "google",
                    }
                }
            })
        );
        assert_eq!(calls[1].payload["data"]["serp_query"]["keyword"], "backlinks");
    }

    #[test]
    fn test_suggestions_limit_and_options() {
        let calls = KeywordListMethod::keyword_suggestions()
            .build_calls(&params(json!({
                "keywords": ["rust"],
                "limit": 9999,
                "device": "mobile",
                "engine": "bing",
            })))
            .unwrap();

        let data = &calls[0].payload["data"];
        assert_eq!(data["page"]["limit"], 500);
        assert_eq!(data["serp_query"]["device"], "mobile");
        assert_eq!(data["serp_query"]["engine"], "bing");
    }

    #[test]
    fn test_keywords_must_be_a_list() {
        let err = KeywordListMethod::search_intent()
            .build_calls(&params(json!({"keywords": "rust"})))
            .unwrap_err();
        assert!(matches!(err, RpcRouterError::InvalidRequest(_)));
    }
}
