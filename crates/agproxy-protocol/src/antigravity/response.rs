use serde::Deserialize;
use serde_json::{Map as JsonMap, Value as JsonValue};

use super::types::Part;

/// One decoded upstream stream event (the JSON carried by a `data:` line).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamGenerateResponse {
    #[serde(default)]
    pub response: ResponseBody,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseBody {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<CandidateContent>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// Upstream model listing. The `models` field arrives either as an object
/// whose keys are model ids or as an array of entries.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelsResponse {
    #[serde(default)]
    pub models: ModelsPayload,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ModelsPayload {
    Map(JsonMap<String, JsonValue>),
    List(Vec<JsonValue>),
}

impl Default for ModelsPayload {
    fn default() -> Self {
        ModelsPayload::Map(JsonMap::new())
    }
}

impl ModelsPayload {
    /// Normalize both wire shapes into a plain list of model identifiers.
    pub fn into_ids(self) -> Vec<String> {
        match self {
            ModelsPayload::Map(map) => map.into_iter().map(|(id, _)| id).collect(),
            ModelsPayload::List(entries) => entries
                .into_iter()
                .filter_map(|entry| match entry {
                    JsonValue::String(id) => Some(id),
                    JsonValue::Object(object) => object
                        .get("name")
                        .or_else(|| object.get("id"))
                        .and_then(JsonValue::as_str)
                        .map(str::to_string),
                    _ => None,
                })
                .collect(),
        }
    }
}
