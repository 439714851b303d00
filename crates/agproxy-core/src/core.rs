use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use agproxy_auth::RotationManager;
use agproxy_upstream::UpstreamConfig;

use crate::handler::{chat_completions, list_models};

pub struct CoreState {
    pub rotation: RotationManager,
    pub upstream: UpstreamConfig,
    /// When set, callers must present it as a bearer key.
    pub api_key: Option<String>,
}

pub struct Core {
    state: Arc<CoreState>,
}

impl Core {
    pub fn new(state: CoreState) -> Self {
        Self {
            state: Arc::new(state),
        }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/v1/chat/completions", post(chat_completions))
            .route("/v1/models", get(list_models))
            .with_state(self.state.clone())
    }

    pub fn state(&self) -> Arc<CoreState> {
        self.state.clone()
    }
}
