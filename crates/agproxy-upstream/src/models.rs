use std::time::Instant;

use http::header::{CONTENT_TYPE, HOST, USER_AGENT};
use serde_json::json;
use tracing::{info, warn};

use agproxy_protocol::antigravity::ModelsResponse;

use crate::client::shared_client;
use crate::config::UpstreamConfig;
use crate::error::UpstreamError;

/// Fetch the upstream model listing. Both `models` wire shapes (key set
/// and element list) deserialize into [`ModelsResponse`].
pub async fn fetch_models(
    config: &UpstreamConfig,
    access_token: &str,
    trace_id: &str,
) -> Result<ModelsResponse, UpstreamError> {
    let started_at = Instant::now();
    info!(
        event = "upstream_request",
        trace_id = %trace_id,
        op = "assistant.fetch_models",
    );
    let response = shared_client()
        .post(&config.models_url)
        .header(HOST, &config.host)
        .header(USER_AGENT, &config.user_agent)
        .bearer_auth(access_token)
        .header(CONTENT_TYPE, "application/json")
        .json(&json!({}))
        .send()
        .await
        .map_err(|err| {
            warn!(
                event = "upstream_response",
                trace_id = %trace_id,
                op = "assistant.fetch_models",
                status = "error",
                elapsed_ms = started_at.elapsed().as_millis(),
                error = %err,
            );
            UpstreamError::Request(err)
        })?;

    let status = response.status();
    info!(
        event = "upstream_response",
        trace_id = %trace_id,
        op = "assistant.fetch_models",
        status = %status.as_u16(),
        elapsed_ms = started_at.elapsed().as_millis(),
    );
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(UpstreamError::Call { status, body });
    }
    Ok(response.json::<ModelsResponse>().await?)
}
