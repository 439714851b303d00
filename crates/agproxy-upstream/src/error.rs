use http::StatusCode;
use thiserror::Error;

/// Failures surfaced to the caller of an upstream operation. All are scoped
/// to the single request in flight; none is process-fatal.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Every credential is disabled or every refresh attempt failed.
    #[error("no available credential")]
    NoCredentialAvailable,
    /// The upstream rejected the bearer token's account.
    #[error("account lacks permission: {body}")]
    PermissionDenied { body: String },
    /// Non-success status from the generate or model-listing call.
    #[error("upstream call failed ({status}): {body}")]
    Call { status: StatusCode, body: String },
    /// Transport failure issuing the request or reading the response.
    #[error("upstream request failed: {0}")]
    Request(#[from] wreq::Error),
    /// Transport failure while consuming the streamed body.
    #[error("upstream stream failed: {0}")]
    Stream(#[from] std::io::Error),
}

impl UpstreamError {
    /// The status a caller-facing error response should carry.
    pub fn response_status(&self) -> StatusCode {
        match self {
            UpstreamError::NoCredentialAvailable => StatusCode::SERVICE_UNAVAILABLE,
            UpstreamError::PermissionDenied { .. } => StatusCode::FORBIDDEN,
            UpstreamError::Call { status, .. } => *status,
            UpstreamError::Request(_) | UpstreamError::Stream(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}
