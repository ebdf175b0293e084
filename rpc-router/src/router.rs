use crate::api::keyword::KeywordListMethod;
use crate::api::link::{LinkIntersect, LinkStatus};
use crate::api::llm::{LlmChat, LlmEmbedding};
use crate::api::quota::QuotaLookup;
use crate::api::site::SiteListMethod;
use crate::call::{Batch, DispatchMode};
use crate::config::Config;
use crate::errors::RpcRouterError;
use crate::handler::{Method, Params};
use indexmap::IndexMap;
use serde_json::Value;
use std::sync::Arc;

/// Immutable registry mapping method names to their strategies.
///
/// Built once at startup and shared by every request.
#[derive(Clone)]
pub struct Router {
    methods: Arc<IndexMap<&'static str, Arc<dyn Method>>>,
    max_batch_items: Option<usize>,
}

impl Router {
    /// Registers the Moz methods, plus the LLM methods when `llm` is configured.
    pub fn new(config: &Config) -> Self {
        let mut methods: Vec<Arc<dyn Method>> = vec![
            Arc::new(SiteListMethod::site_metrics()),
            Arc::new(SiteListMethod::brand_authority()),
            Arc::new(SiteListMethod::ranking_keywords()),
            Arc::new(SiteListMethod::linking_domains()),
            Arc::new(SiteListMethod::anchor_text()),
            Arc::new(SiteListMethod::top_pages()),
            Arc::new(KeywordListMethod::keyword_metrics()),
            Arc::new(KeywordListMethod::keyword_suggestions()),
            Arc::new(KeywordListMethod::search_intent()),
            Arc::new(LinkIntersect),
            Arc::new(LinkStatus),
            Arc::new(QuotaLookup),
        ];

        if let Some(llm) = &config.llm {
            methods.push(Arc::new(LlmChat::new(llm.chat_model.clone())));
            methods.push(Arc::new(LlmEmbedding::new(llm.embedding_model.clone())));
        }

        Self::from_methods(methods, config.limits.max_batch_items)
    }

    pub fn from_methods(methods: Vec<Arc<dyn Method>>, max_batch_items: Option<usize>) -> Self {
        let methods = methods
            .into_iter()
            .map(|method| (method.name(), method))
            .collect();

        Self {
            methods: Arc::new(methods),
            max_batch_items,
        }
    }

    pub fn method_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.methods.keys().copied()
    }

    /// The registered name matching `name`, if any.
    pub fn method_name(&self, name: &str) -> Option<&'static str> {
        self.methods.get_key_value(name).map(|(key, _)| *key)
    }

    /// Translates a logical method and its parameters into a batch of calls.
    pub fn route(
        &self,
        method: Option<&str>,
        params: Option<&Value>,
    ) -> Result<Batch, RpcRouterError> {
        let name = method
            .filter(|m| !m.is_empty())
            .ok_or_else(|| RpcRouterError::InvalidRequest("Missing method".into()))?;

        let handler = self
            .methods
            .get(name)
            .ok_or_else(|| RpcRouterError::InvalidMethod(name.to_string()))?;

        let empty = Params::new();
        let params = match params {
            None | Some(Value::Null) if handler.requires_params() => {
                return Err(RpcRouterError::InvalidRequest("Missing params".into()));
            }
            None | Some(Value::Null) => &empty,
            Some(Value::Object(map)) => map,
            Some(_) if handler.requires_params() => {
                return Err(RpcRouterError::InvalidRequest(
                    "params must be an object".into(),
                ));
            }
            Some(_) => &empty,
        };

        let calls = handler.build_calls(params)?;
        tracing::debug!(
            method = name,
            upstream = handler.upstream().as_str(),
            calls = calls.len(),
            "Routed request"
        );

        let batch = match handler.dispatch_mode() {
            DispatchMode::SingleShot => match <[_; 1]>::try_from(calls) {
                Ok([call]) => Batch::single(call),
                Err(calls) => {
                    return Err(RpcRouterError::InternalError(format!(
                        "single-shot method {name} built {} calls",
                        calls.len()
                    )));
                }
            },
            DispatchMode::FanOut => {
                if let Some(max) = self.max_batch_items
                    && calls.len() > max
                {
                    return Err(RpcRouterError::InvalidRequest(format!(
                        "Too many items: {} (maximum {max})",
                        calls.len()
                    )));
                }
                Batch::fan_out(calls)
            }
        };

        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call::Upstream;
    use crate::config::LlmConfig;
    use serde_json::json;
    use url::Url;

    fn test_config() -> Config {
        serde_yaml::from_str(
            r#"
listener: {host: "127.0.0.1", port: 3000}
admin_listener: {host: "127.0.0.1", port: 3001}
cors: {allowed_origin: "https://app.example.com"}
"#,
        )
        .unwrap()
    }

    fn test_router() -> Router {
        Router::new(&test_config())
    }

    #[test]
    fn test_batch_matches_input_length_and_order() {
        let router = test_router();
        let targets = ["one.com", "two.com", "three.com", "four.com"];
        let batch = router
            .route(Some("siteMetrics"), Some(&json!({ "targets": targets })))
            .unwrap();

        assert_eq!(batch.mode, DispatchMode::FanOut);
        assert_eq!(batch.len(), targets.len());
        for (call, target) in batch.calls.iter().zip(targets) {
            assert_eq!(call.payload["data"]["site_query"]["query"], target);
        }
    }

    #[test]
    fn test_missing_method() {
        let router = test_router();
        let err = router.route(None, Some(&json!({}))).unwrap_err();
        assert!(matches!(err, RpcRouterError::InvalidRequest(_)));

        let err = router.route(Some(""), Some(&json!({}))).unwrap_err();
        assert!(matches!(err, RpcRouterError::InvalidRequest(_)));
    }

    #[test]
    fn test_unknown_method() {
        let router = test_router();
        let err = router
            .route(Some("deleteEverything"), Some(&json!({})))
            .unwrap_err();
        assert!(matches!(err, RpcRouterError::InvalidMethod(name) if name == "deleteEverything"));
    }

    #[test]
    fn test_missing_params() {
        let router = test_router();
        let err = router.route(Some("keywordMetrics"), None).unwrap_err();
        assert!(matches!(err, RpcRouterError::InvalidRequest(_)));

        let err = router
            .route(Some("keywordMetrics"), Some(&Value::Null))
            .unwrap_err();
        assert!(matches!(err, RpcRouterError::InvalidRequest(_)));

        let err = router
            .route(Some("keywordMetrics"), Some(&json!(["seo"])))
            .unwrap_err();
        assert!(matches!(err, RpcRouterError::InvalidRequest(_)));
    }

    #[test]
    fn test_no_params_method() {
        let router = test_router();
        let batch = router.route(Some("quotaLookup"), None).unwrap();
        assert_eq!(batch.mode, DispatchMode::SingleShot);
        assert_eq!(batch.len(), 1);
        assert_eq!(batch.calls[0].upstream_method, "quota.lookup");
    }

    #[test]
    fn test_single_shot_methods() {
        let router = test_router();
        let batch = router
            .route(
                Some("linkStatus"),
                Some(&json!({"target": "example.com", "source": "other.com"})),
            )
            .unwrap();
        assert_eq!(batch.mode, DispatchMode::SingleShot);
        assert_eq!(batch.len(), 1);

        let batch = router
            .route(
                Some("linkIntersect"),
                Some(&json!({"targets": ["a.com", "b.com"]})),
            )
            .unwrap();
        assert_eq!(batch.mode, DispatchMode::SingleShot);
        assert_eq!(batch.len(), 1);
    }

    #[test]
    fn test_max_batch_items() {
        let mut config = test_config();
        config.limits.max_batch_items = Some(2);
        let router = Router::new(&config);

        assert!(
            router
                .route(Some("keywordMetrics"), Some(&json!({"keywords": ["a", "b"]})))
                .is_ok()
        );
        let err = router
            .route(
                Some("keywordMetrics"),
                Some(&json!({"keywords": ["a", "b", "c"]})),
            )
            .unwrap_err();
        assert!(matches!(err, RpcRouterError::InvalidRequest(_)));
    }

    #[test]
    fn test_llm_methods_require_config() {
        let router = test_router();
        let params = json!({"messages": [{"role": "user", "content": "hi"}]});
        assert!(matches!(
            router.route(Some("llmChat"), Some(&params)).unwrap_err(),
            RpcRouterError::InvalidMethod(_)
        ));
        assert!(!router.method_names().any(|name| name == "llmEmbedding"));

        let mut config = test_config();
        config.llm = Some(LlmConfig {
            url: Url::parse("https://llm.example.com/v1/").unwrap(),
            api_key: "sk-test".into(),
            chat_model: "chat-model".into(),
            embedding_model: "embedding-model".into(),
        });
        let router = Router::new(&config);
        let batch = router.route(Some("llmChat"), Some(&params)).unwrap();
        assert_eq!(batch.calls[0].upstream, Upstream::Llm);
        assert_eq!(batch.calls[0].payload["model"], "chat-model");
        assert!(!batch.requires_credential());
    }
}
