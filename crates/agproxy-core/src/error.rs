use axum::body::Body;
use axum::response::{IntoResponse, Response};
use http::header::CONTENT_TYPE;
use http::{HeaderValue, StatusCode};
use serde_json::json;

use agproxy_upstream::UpstreamError;

/// Caller-facing error: a status plus a JSON error body.
#[derive(Debug)]
pub struct ProxyError {
    pub status: StatusCode,
    pub body: String,
}

impl ProxyError {
    pub fn new(status: StatusCode, message: impl AsRef<str>) -> Self {
        Self {
            status,
            body: json!({ "error": { "message": message.as_ref() } }).to_string(),
        }
    }

    pub fn unauthorized(message: &str) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn service_unavailable(message: &str) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }
}

impl From<&UpstreamError> for ProxyError {
    fn from(err: &UpstreamError) -> Self {
        ProxyError::new(err.response_status(), err.to_string())
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        response
    }
}
