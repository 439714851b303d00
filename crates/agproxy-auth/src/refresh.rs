use async_trait::async_trait;
use http::header::CONTENT_TYPE;
use http::{HeaderValue, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;

use crate::cache::CachedToken;

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const DEFAULT_CLIENT_ID: &str =
    "1071006060591-tmhssin2h21lcre235vtolojh4g403ep.apps.googleusercontent.com";
const DEFAULT_CLIENT_SECRET: &str = "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";

/// OAuth endpoint and client identity for the refresh-token grant.
#[derive(Debug, Clone)]
pub struct OauthConfig {
    pub token_uri: String,
    pub client_id: String,
    pub client_secret: String,
}

impl Default for OauthConfig {
    fn default() -> Self {
        Self {
            token_uri: DEFAULT_TOKEN_URI.to_string(),
            client_id: DEFAULT_CLIENT_ID.to_string(),
            client_secret: DEFAULT_CLIENT_SECRET.to_string(),
        }
    }
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    refresh_token: &'a str,
    grant_type: &'static str,
}

#[derive(Deserialize)]
struct RefreshResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("refresh request failed: {0}")]
    Network(#[from] wreq::Error),
    #[error("refresh rejected ({status}): {body}")]
    Rejected { status: StatusCode, body: String },
}

/// Exchanges a long-lived refresh secret for a short-lived access token.
/// A trait seam so rotation can be exercised without the network.
#[async_trait]
pub trait TokenExchanger: Send + Sync {
    async fn exchange(&self, refresh_token: &str) -> Result<CachedToken, RefreshError>;
}

/// The real exchanger: OAuth2 refresh-token grant, form-encoded POST.
pub struct OauthExchanger {
    config: OauthConfig,
    client: wreq::Client,
}

impl OauthExchanger {
    pub fn new(config: OauthConfig) -> Self {
        Self {
            config,
            client: wreq::Client::new(),
        }
    }
}

#[async_trait]
impl TokenExchanger for OauthExchanger {
    async fn exchange(&self, refresh_token: &str) -> Result<CachedToken, RefreshError> {
        let request = RefreshRequest {
            client_id: &self.config.client_id,
            client_secret: &self.config.client_secret,
            refresh_token,
            grant_type: "refresh_token",
        };
        let response = self
            .client
            .post(&self.config.token_uri)
            .header(
                CONTENT_TYPE,
                HeaderValue::from_static("application/x-www-form-urlencoded"),
            )
            .form(&request)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RefreshError::Rejected { status, body });
        }
        let payload = response.json::<RefreshResponse>().await?;
        Ok(CachedToken {
            access_token: payload.access_token,
            expires_in: payload.expires_in,
            timestamp: OffsetDateTime::now_utc().unix_timestamp(),
        })
    }
}
