use crate::call::{CallSpec, DispatchMode, Upstream};
use crate::errors::RpcRouterError;
use serde_json::{Map, Value};

pub type Params = Map<String, Value>;

/// Strategy for one logical method exposed on the endpoint.
///
/// Implementations are pure: they turn the caller's parameters into the
/// upstream calls to make and never perform I/O themselves.
pub trait Method: Send + Sync {
    fn name(&self) -> &'static str;

    fn dispatch_mode(&self) -> DispatchMode;

    fn upstream(&self) -> Upstream {
        Upstream::Moz
    }

    /// Methods that return false are called with an empty parameter map
    /// when the caller omits `params`.
    fn requires_params(&self) -> bool {
        true
    }

    /// Build the calls for this method, in the order their outcomes are reported.
    fn build_calls(&self, params: &Params) -> Result<Vec<CallSpec>, RpcRouterError>;
}
