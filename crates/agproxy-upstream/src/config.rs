/// Upstream endpoints and identification headers.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub generate_url: String,
    pub models_url: String,
    pub host: String,
    pub user_agent: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            generate_url:
                "https://daily-cloudcode-pa.sandbox.googleapis.com/v1internal:streamGenerateContent?alt=sse"
                    .to_string(),
            models_url:
                "https://daily-cloudcode-pa.sandbox.googleapis.com/v1internal:fetchAvailableModels"
                    .to_string(),
            host: "daily-cloudcode-pa.sandbox.googleapis.com".to_string(),
            user_agent: "antigravity/1.11.3 windows/amd64".to_string(),
        }
    }
}
