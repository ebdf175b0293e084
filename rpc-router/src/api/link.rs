//! Single-shot link methods that relate two sets of sites.

use super::utils::{
    LimitRange, SharedOptions, normalize_url, optional_string_list, page, required_string,
    string_list, string_or,
};
use crate::call::{CallSpec, DispatchMode};
use crate::errors::RpcRouterError;
use crate::handler::{Method, Params};
use serde_json::{Value, json};

const INTERSECT_LIMIT: LimitRange = LimitRange::new(25, 1, 50);

/// Sites linking to every one of `targets` and to none of `excluded`.
pub struct LinkIntersect;

impl Method for LinkIntersect {
    fn name(&self) -> &'static str {
        "linkIntersect"
    }

    fn dispatch_mode(&self) -> DispatchMode {
        DispatchMode::SingleShot
    }

    fn build_calls(&self, params: &Params) -> Result<Vec<CallSpec>, RpcRouterError> {
        let options = SharedOptions::from_params(params);
        let site_queries = |sites: Vec<String>| -> Vec<Value> {
            sites.iter().map(|site| options.site_query(site)).collect()
        };

        let linking_to = site_queries(string_list(params, "targets")?);
        let not_linking_to = site_queries(optional_string_list(params, "excluded")?);
        let limit = INTERSECT_LIMIT.clamp(params.get("limit"));

        let payload = json!({
            "data": {
                "is_linking_to": linking_to,
                "not_linking_to": not_linking_to,
                "scope": options.scope,
                "sort": string_or(params, "sort", "source_domain_authority"),
                "page": page(limit),
            }
        });

        Ok(vec![CallSpec::moz("data.site.link.intersect.fetch", payload)])
    }
}

/// Whether `source` links to `target`.
pub struct LinkStatus;

impl Method for LinkStatus {
    fn name(&self) -> &'static str {
        "linkStatus"
    }

    fn dispatch_mode(&self) -> DispatchMode {
        DispatchMode::SingleShot
    }

    fn build_calls(&self, params: &Params) -> Result<Vec<CallSpec>, RpcRouterError> {
        let options = SharedOptions::from_params(params);
        let target = normalize_url(required_string(params, "target")?);
        let source = normalize_url(required_string(params, "source")?);

        let payload = json!({
            "data": {
                "target_query": options.site_query(&target),
                "source_query": options.site_query(&source),
            }
        });

        Ok(vec![CallSpec::moz("data.site.link.status.fetch", payload)])
    }
}
