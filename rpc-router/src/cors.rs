use crate::config::{CorsConfig, ValidationError};
use http::HeaderValue;
use http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
};
use hyper::Response;

const ALLOWED_METHODS: &str = "POST, OPTIONS";
const ALLOWED_HEADERS: &str = "Content-Type";

/// CORS headers for the single browser origin allowed to call the endpoint.
#[derive(Clone, Debug)]
pub struct Cors {
    allowed_origin: HeaderValue,
}

impl Cors {
    pub fn new(config: &CorsConfig) -> Result<Self, ValidationError> {
        let allowed_origin = HeaderValue::from_str(&config.allowed_origin)
            .map_err(|_| ValidationError::InvalidAllowedOrigin(config.allowed_origin.clone()))?;
        Ok(Self { allowed_origin })
    }

    pub fn apply<B>(&self, response: &mut Response<B>) {
        let headers = response.headers_mut();
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, self.allowed_origin.clone());
        headers.insert(
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOWED_METHODS),
        );
        headers.insert(
            ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOWED_HEADERS),
        );
    }
}
