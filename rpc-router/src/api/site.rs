//! Methods that fan out over a list of site targets.

use super::utils::{LimitRange, SharedOptions, normalize_url, page, string_list, string_or};
use crate::call::{CallSpec, DispatchMode};
use crate::errors::RpcRouterError;
use crate::handler::{Method, Params};
use serde_json::{Map, Value};

const SITE_LIST_LIMIT: LimitRange = LimitRange::new(25, 1, 50);

/// One call per entry of `params.targets`.
///
/// Each call carries `{data: {<query_key>: {query, scope[, locale]}, ...}}`
/// plus the optional sort, filter and page sections enabled for the method.
pub struct SiteListMethod {
    name: &'static str,
    upstream_method: &'static str,
    query_key: &'static str,
    normalize_targets: bool,
    with_locale: bool,
    default_sort: Option<&'static str>,
    with_filter: bool,
    limit: Option<LimitRange>,
}

impl SiteListMethod {
    pub fn site_metrics() -> Self {
        Self::base("siteMetrics", "data.site.metrics.fetch")
    }

    pub fn brand_authority() -> Self {
        Self::base("brandAuthority", "data.site.metrics.brand.authority.fetch")
    }

    pub fn ranking_keywords() -> Self {
        Self {
            query_key: "target_query",
            normalize_targets: true,
            with_locale: true,
            default_sort: Some("rank"),
            limit: Some(SITE_LIST_LIMIT),
            ..Self::base("rankingKeywords", "data.site.ranking-keyword.list")
        }
    }

    pub fn linking_domains() -> Self {
        Self {
            default_sort: Some("source_domain_authority"),
            with_filter: true,
            limit: Some(SITE_LIST_LIMIT),
            ..Self::base("linkingDomains", "data.site.linking-domain.list")
        }
    }

    pub fn anchor_text() -> Self {
        Self {
            limit: Some(SITE_LIST_LIMIT),
            ..Self::base("anchorText", "data.site.anchor-text.list")
        }
    }

    pub fn top_pages() -> Self {
        Self {
            default_sort: Some("page_authority"),
            with_filter: true,
            limit: Some(SITE_LIST_LIMIT),
            ..Self::base("topPages", "data.site.top-page.list")
        }
    }

    fn base(name: &'static str, upstream_method: &'static str) -> Self {
        Self {
            name,
            upstream_method,
            query_key: "site_query",
            normalize_targets: false,
            with_locale: false,
            default_sort: None,
            with_filter: false,
            limit: None,
        }
    }

    fn payload(&self, target: &str, options: &SharedOptions, params: &Params) -> Value {
        let query = match self.normalize_targets {
            true => normalize_url(target),
            false => target.to_string(),
        };

        let mut query_value = options.site_query(&query);
        if self.with_locale {
            query_value["locale"] = Value::from(options.locale.as_str());
        }

        let mut data = Map::new();
        data.insert(self.query_key.to_string(), query_value);

        if let Some(default_sort) = self.default_sort {
            let sort = string_or(params, "sort", default_sort);
            data.insert("sort".to_string(), Value::from(sort));
        }
        if self.with_filter
            && let Some(filter) = params.get("filter").and_then(Value::as_str)
        {
            data.insert("filter".to_string(), Value::from(filter));
        }
        if let Some(range) = self.limit {
            data.insert("page".to_string(), page(range.clamp(params.get("limit"))));
        }

        serde_json::json!({ "data": data })
    }
}

impl Method for SiteListMethod {
    fn name(&self) -> &'static str {
        self.name
    }

    fn dispatch_mode(&self) -> DispatchMode {
        DispatchMode::FanOut
    }

    fn build_calls(&self, params: &Params) -> Result<Vec<CallSpec>, RpcRouterError> {
        let targets = string_list(params, "targets")?;
        let options = SharedOptions::from_params(params);

        Ok(targets
            .iter()
            .map(|target| {
                CallSpec::moz(self.upstream_method, self.payload(target, &options, params))
            })
            .collect())
    }
}
