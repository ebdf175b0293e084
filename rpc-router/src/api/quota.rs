use crate::call::{CallSpec, DispatchMode};
use crate::errors::RpcRouterError;
use crate::handler::{Method, Params};
use serde_json::json;

/// Remaining row quota for the caller's key. Takes no parameters.
pub struct QuotaLookup;

impl Method for QuotaLookup {
    fn name(&self) -> &'static str {
        "quotaLookup"
    }

    fn dispatch_mode(&self) -> DispatchMode {
        DispatchMode::SingleShot
    }

    fn requires_params(&self) -> bool {
        false
    }

    fn build_calls(&self, _params: &Params) -> Result<Vec<CallSpec>, RpcRouterError> {
        Ok(vec![CallSpec::moz(
            "quota.lookup",
            json!({ "data": { "path": "api.limits.data.rows" } }),
        )])
    }
}
