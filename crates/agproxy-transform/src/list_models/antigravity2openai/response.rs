use agproxy_protocol::antigravity::ModelsResponse;
use agproxy_protocol::openai::{ListModelsResponse, Model};

/// Convert the upstream model listing into the caller's model-list shape.
pub fn transform_response(response: ModelsResponse, created: i64) -> ListModelsResponse {
    ListModelsResponse {
        object: "list",
        data: response
            .models
            .into_ids()
            .into_iter()
            .map(|id| Model {
                id,
                object: "model",
                created,
                owned_by: "google",
            })
            .collect(),
    }
}
