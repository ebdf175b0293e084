//! Mock upstream used by the tests.
//!
//! Behaviour is driven by markers found anywhere in the JSON-RPC params:
//! - `html`: 200 with an HTML body
//! - `fail`: 200 with a JSON-RPC error object
//! - `status500`: 500 with a structured error message
//! - `status503`: 503 with an empty JSON object
//! - `slow`: success after a delay
//!
//! Anything else succeeds and echoes the request back as the `result`.
//! Requests outside `/` are treated as LLM calls and echoed with their path
//! and authorization header.

use crate::config::Config;
use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::header::CONTENT_TYPE;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::{TokioExecutor, TokioIo};
use serde_json::{Value, json};
use std::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::net::TcpListener;
use url::Url;

pub const SLOW_DELAY: Duration = Duration::from_millis(300);

#[derive(Default)]
struct Counters {
    requests: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

pub struct MockUpstream {
    port: u16,
    counters: Arc<Counters>,
}

impl MockUpstream {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let counters = Arc::new(Counters::default());

        let server_counters = counters.clone();
        tokio::spawn(async move {
            loop {
                let (stream, _) = listener.accept().await.unwrap();
                let io = TokioIo::new(stream);
                let counters = server_counters.clone();

                tokio::spawn(async move {
                    let service = service_fn(move |req: Request<Incoming>| {
                        let counters = counters.clone();
                        async move { Ok::<_, Infallible>(handle(req, &counters).await) }
                    });

                    let _ = hyper_util::server::conn::auto::Builder::new(TokioExecutor::new())
                        .serve_connection(io, service)
                        .await;
                });
            }
        });

        Self { port, counters }
    }

    pub fn url(&self) -> Url {
        Url::parse(&format!("http://127.0.0.1:{}/", self.port)).unwrap()
    }

    pub fn requests(&self) -> usize {
        self.counters.requests.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.counters.max_in_flight.load(Ordering::SeqCst)
    }
}

async fn handle(req: Request<Incoming>, counters: &Counters) -> Response<Full<Bytes>> {
    counters.requests.fetch_add(1, Ordering::SeqCst);
    let current = counters.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    counters.max_in_flight.fetch_max(current, Ordering::SeqCst);

    let response = respond(req).await;

    counters.in_flight.fetch_sub(1, Ordering::SeqCst);
    response
}

async fn respond(req: Request<Incoming>) -> Response<Full<Bytes>> {
    let (parts, body) = req.into_parts();
    let body = body.collect().await.unwrap().to_bytes();
    let request: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    let header = |name: &str| {
        parts
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    if parts.uri.path() != "/" {
        return json_response(
            StatusCode::OK,
            json!({
                "path": parts.uri.path(),
                "authorization": header("authorization"),
                "request": request,
            }),
        );
    }

    let markers = request["params"].to_string();
    let id = request["id"].clone();

    if markers.contains("html") {
        let mut response = Response::new(Full::new(Bytes::from_static(
            b"<html><body><h1>502 Bad Gateway</h1></body></html>",
        )));
        response
            .headers_mut()
            .insert(CONTENT_TYPE, "text/html".parse().unwrap());
        return response;
    }
    if markers.contains("fail") {
        return json_response(
            StatusCode::OK,
            json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": {"code": -32000, "message": "Site not found"},
            }),
        );
    }
    if markers.contains("status500") {
        return json_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({"error": {"message": "Upstream exploded"}}),
        );
    }
    if markers.contains("status503") {
        return json_response(StatusCode::SERVICE_UNAVAILABLE, json!({}));
    }
    if markers.contains("slow") {
        tokio::time::sleep(SLOW_DELAY).await;
    }

    json_response(
        StatusCode::OK,
        json!({
            "jsonrpc": "2.0",
            "id": id,
            "result": {
                "jsonrpc": request["jsonrpc"],
                "id": id,
                "method": request["method"],
                "params": request["params"],
                "token": header("x-moz-token"),
            },
        }),
    )
}

fn json_response(status: StatusCode, value: Value) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(value.to_string())));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, "application/json".parse().unwrap());
    response
}

/// Router config pointing the Moz upstream at `moz_url`.
pub fn test_config(moz_url: Url) -> Config {
    let mut config: Config = serde_yaml::from_str(
        r#"
listener: {host: "127.0.0.1", port: 3000}
admin_listener: {host: "127.0.0.1", port: 3001}
endpoint_path: /api/seo
cors: {allowed_origin: "https://app.example.com"}
limits: {upstream_timeout_secs: 5}
"#,
    )
    .unwrap();
    config.moz.url = moz_url;
    config
}
