use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Empty, Full};
use hyper::body::{Bytes, Incoming};
use hyper::header::{CONTENT_TYPE, HeaderValue};
use hyper::service::Service;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioExecutor;
use hyper_util::rt::TokioIo;
use hyper_util::server::conn::auto::Builder;
use serde::Serialize;
use std::sync::Arc;
use tokio::net::TcpListener;

pub async fn run_http_service<S, E>(host: &str, port: u16, service: S) -> Result<(), E>
where
    S: Service<Request<Incoming>, Response = Response<BoxBody<Bytes, E>>, Error = E>
        + Send
        + Sync
        + 'static,
    S::Future: Send + 'static,
    E: From<std::io::Error> + std::error::Error + Send + Sync + 'static,
{
    let listener = TcpListener::bind(format!("{host}:{port}")).await?;
    let service_arc = Arc::new(service);
    tracing::info!(host, port, "Listening");

    loop {
        let (stream, peer_addr) = listener.accept().await?;
        let _ = stream.set_nodelay(true);
        let io = TokioIo::new(stream);
        let svc = service_arc.clone();

        // Hand the connection to hyper; auto-detect h1/h2 on this socket
        tokio::spawn(async move {
            if let Err(e) = Builder::new(TokioExecutor::new())
                .serve_connection(io, svc)
                .await
            {
                tracing::debug!(peer = %peer_addr, error = %e, "Connection closed with error");
            }
        });
    }
}

/// Plain-text response carrying the canonical reason of `status_code`.
pub fn make_boxed_error_response<E>(status_code: StatusCode) -> Response<BoxBody<Bytes, E>>
where
    E: 'static,
{
    let message = status_code
        .canonical_reason()
        .unwrap_or("an error occurred");

    let mut response = Response::new(
        Full::new(Bytes::from(format!("{message}\n")))
            .map_err(|e| match e {})
            .boxed(),
    );
    *response.status_mut() = status_code;
    response
}

/// Response with no body, used for preflight replies.
pub fn make_empty_response<E>(status_code: StatusCode) -> Response<BoxBody<Bytes, E>>
where
    E: 'static,
{
    let mut response = Response::new(Empty::<Bytes>::new().map_err(|e| match e {}).boxed());
    *response.status_mut() = status_code;
    response
}

/// Serializes `value` as the JSON body of a response with the given status.
pub fn make_json_response<T, E>(
    status_code: StatusCode,
    value: &T,
) -> Result<Response<BoxBody<Bytes, E>>, serde_json::Error>
where
    T: Serialize + ?Sized,
    E: 'static,
{
    let bytes = serde_json::to_vec(value).map(Bytes::from)?;

    let mut response = Response::new(Full::new(bytes).map_err(|e| match e {}).boxed());
    *response.status_mut() = status_code;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    async fn body_string(response: Response<BoxBody<Bytes, Infallible>>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_error_response_uses_canonical_reason() {
        let response = make_boxed_error_response::<Infallible>(StatusCode::NOT_FOUND);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_string(response).await, "Not Found\n");
    }

    #[tokio::test]
    async fn test_json_response() {
        let value = serde_json::json!({"error": "bad"});
        let response =
            make_json_response::<_, Infallible>(StatusCode::BAD_REQUEST, &value).unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/json"
        );
        assert_eq!(body_string(response).await, r#"{"error":"bad"}"#);
    }

    #[tokio::test]
    async fn test_empty_response() {
        let response = make_empty_response::<Infallible>(StatusCode::OK);
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "");
    }
}
