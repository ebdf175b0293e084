use crate::call::Outcome;
use crate::config::Config;
use crate::cors::Cors;
use crate::errors::RpcRouterError;
use crate::executor::Executor;
use crate::metrics_defs::{REQUEST_DURATION, REQUESTS, REQUESTS_INFLIGHT};
use crate::router::Router;
use crate::upstream::{Credential, UpstreamClient};
use http_body_util::BodyExt;
use http_body_util::combinators::BoxBody;
use hyper::body::{Body, Bytes, Incoming};
use hyper::service::Service;
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::http::{make_empty_response, make_json_response};
use shared::{counter, gauge, histogram};
use std::fmt::Display;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::time::Instant;

pub type ServiceBody = BoxBody<Bytes, RpcRouterError>;

/// Body accepted on the endpoint: `{apiKey, method, params}`.
#[derive(Debug, Deserialize)]
struct EndpointRequest {
    #[serde(rename = "apiKey")]
    api_key: Option<String>,
    method: Option<String>,
    params: Option<Value>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

/// The RPC endpoint: CORS preflight plus `POST {apiKey, method, params}`.
#[derive(Clone)]
pub struct RpcRouterService {
    inner: Arc<Inner>,
}

struct Inner {
    router: Router,
    executor: Executor,
    cors: Cors,
    endpoint_path: String,
}

impl RpcRouterService {
    pub fn new(config: &Config) -> Result<Self, RpcRouterError> {
        let router = Router::new(config);
        let client = UpstreamClient::new(config)?;
        let executor = Executor::new(client, config.limits.max_concurrent_calls);
        let cors = Cors::new(&config.cors)?;

        tracing::info!(
            endpoint = %config.endpoint_path,
            methods = ?router.method_names().collect::<Vec<_>>(),
            max_concurrent_calls = config.limits.max_concurrent_calls,
            "Registered methods"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                router,
                executor,
                cors,
                endpoint_path: config.endpoint_path.clone(),
            }),
        })
    }

    pub async fn handle<B>(&self, req: Request<B>) -> Response<ServiceBody>
    where
        B: Body + Send + 'static,
        B::Error: Display,
    {
        self.inner.handle(req).await
    }
}

impl Service<Request<Incoming>> for RpcRouterService {
    type Response = Response<ServiceBody>;
    type Error = RpcRouterError;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let inner = self.inner.clone();

        Box::pin(async move {
            // Handled on its own task so a panic becomes a 500 and a dropped
            // connection does not cancel calls already issued.
            let task_inner = inner.clone();
            match tokio::spawn(async move { task_inner.handle(req).await }).await {
                Ok(response) => Ok(response),
                Err(e) => {
                    tracing::error!(error = %e, "Request handler panicked");
                    let err = RpcRouterError::InternalError(e.to_string());
                    let mut response = inner.error_response(&err);
                    inner.cors.apply(&mut response);
                    Ok(response)
                }
            }
        })
    }
}

impl Inner {
    async fn handle<B>(&self, req: Request<B>) -> Response<ServiceBody>
    where
        B: Body + Send + 'static,
        B::Error: Display,
    {
        if req.uri().path() != self.endpoint_path {
            return json_error(StatusCode::NOT_FOUND, "Not found");
        }

        let mut response = match *req.method() {
            Method::OPTIONS => make_empty_response(StatusCode::OK),
            Method::POST => self.handle_post(req).await,
            _ => json_error(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed"),
        };
        self.cors.apply(&mut response);
        response
    }

    async fn handle_post<B>(&self, req: Request<B>) -> Response<ServiceBody>
    where
        B: Body + Send + 'static,
        B::Error: Display,
    {
        let start = Instant::now();
        let inflight = gauge!(REQUESTS_INFLIGHT);
        inflight.increment(1.0);

        let mut method_label = "unknown";
        let response = match self.process(req, &mut method_label).await {
            Ok(outcomes) => {
                let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
                tracing::info!(
                    method = method_label,
                    calls = outcomes.len(),
                    succeeded,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Request completed"
                );
                make_json_response(StatusCode::OK, &outcomes).unwrap_or_else(|e| {
                    self.error_response(&RpcRouterError::InternalError(e.to_string()))
                })
            }
            Err(e) => self.error_response(&e),
        };

        inflight.decrement(1.0);
        let status = response.status().as_u16().to_string();
        counter!(REQUESTS, "method" => method_label, "status" => status.clone()).increment(1);
        histogram!(REQUEST_DURATION, "method" => method_label, "status" => status)
            .record(start.elapsed().as_secs_f64());

        response
    }

    async fn process<B>(
        &self,
        req: Request<B>,
        method_label: &mut &'static str,
    ) -> Result<Vec<Outcome>, RpcRouterError>
    where
        B: Body + Send + 'static,
        B::Error: Display,
    {
        let bytes = req
            .into_body()
            .collect()
            .await
            .map_err(|e| RpcRouterError::RequestBodyError(e.to_string()))?
            .to_bytes();

        let request: EndpointRequest = serde_json::from_slice(&bytes)
            .map_err(|_| RpcRouterError::InvalidRequest("Invalid JSON body".into()))?;

        if let Some(name) = request
            .method
            .as_deref()
            .and_then(|m| self.router.method_name(m))
        {
            *method_label = name;
        }

        let batch = self
            .router
            .route(request.method.as_deref(), request.params.as_ref())?;

        let credential = match (batch.requires_credential(), request.api_key.as_deref()) {
            (false, _) => None,
            (true, Some(api_key)) if !api_key.is_empty() => Some(Credential::new(api_key)?),
            (true, _) => return Err(RpcRouterError::InvalidRequest("Missing apiKey".into())),
        };

        Ok(self.executor.execute(batch, credential).await)
    }

    fn error_response(&self, err: &RpcRouterError) -> Response<ServiceBody> {
        let status = err.status_code();
        if status.is_server_error() {
            tracing::error!(error = %err, "Request failed");
        } else {
            tracing::debug!(error = %err, "Rejected request");
        }

        json_error(status, &err.public_message())
    }
}

fn json_error(status: StatusCode, message: &str) -> Response<ServiceBody> {
    make_json_response(status, &ErrorBody { error: message })
        .unwrap_or_else(|_| make_empty_response(status))
}
