use http::header::AUTHORIZATION;
use http::HeaderMap;

use crate::core::CoreState;
use crate::error::ProxyError;

/// Bearer API-key gate. No configured key means the gate is open.
pub(crate) fn verify_api_key(state: &CoreState, headers: &HeaderMap) -> Result<(), ProxyError> {
    let Some(expected) = state.api_key.as_deref() else {
        return Ok(());
    };
    let Some(value) = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
    else {
        return Err(ProxyError::unauthorized("Missing API Key"));
    };
    // The key is the last whitespace-separated token, so both bare keys
    // and `Bearer <key>` are accepted.
    let provided = value.rsplit(' ').next().unwrap_or(value);
    if provided != expected {
        return Err(ProxyError::unauthorized("Invalid API Key"));
    }
    Ok(())
}
