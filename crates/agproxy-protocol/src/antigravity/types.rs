use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// One upstream conversation turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub role: ContentRole,
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentRole {
    User,
    Model,
}

/// One typed sub-part of an upstream turn. The wire shape is discriminated
/// by which key is present, so the variants deserialize untagged with the
/// text variant last (it is the only one without a distinguishing key).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    FunctionCall {
        #[serde(rename = "functionCall")]
        function_call: FunctionCall,
    },
    FunctionResponse {
        #[serde(rename = "functionResponse")]
        function_response: FunctionResponse,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
    Text {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        thought: Option<bool>,
    },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text {
            text: text.into(),
            thought: None,
        }
    }

    pub fn inline_data(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Part::InlineData {
            inline_data: InlineData {
                mime_type: mime_type.into(),
                data: data.into(),
            },
        }
    }

    pub fn function_call(id: impl Into<String>, name: impl Into<String>, args: JsonValue) -> Self {
        Part::FunctionCall {
            function_call: FunctionCall {
                id: Some(id.into()),
                name: name.into(),
                args,
            },
        }
    }

    pub fn function_response(
        id: impl Into<String>,
        name: impl Into<String>,
        response: JsonValue,
    ) -> Self {
        Part::FunctionResponse {
            function_response: FunctionResponse {
                id: Some(id.into()),
                name: name.into(),
                response,
            },
        }
    }

    pub fn is_function_response(&self) -> bool {
        matches!(self, Part::FunctionResponse { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub args: JsonValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub response: JsonValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn part_deserializes_by_distinguishing_key() {
        let part: Part = serde_json::from_value(json!({ "text": "hi" })).unwrap();
        assert_eq!(part, Part::text("hi"));

        let part: Part = serde_json::from_value(json!({ "text": "hm", "thought": true })).unwrap();
        assert_eq!(
            part,
            Part::Text {
                text: "hm".to_string(),
                thought: Some(true),
            }
        );

        let part: Part = serde_json::from_value(json!({
            "functionCall": { "id": "call_1", "name": "search", "args": { "q": "rust" } }
        }))
        .unwrap();
        assert_eq!(part, Part::function_call("call_1", "search", json!({ "q": "rust" })));

        let part: Part = serde_json::from_value(json!({
            "inlineData": { "mimeType": "image/png", "data": "AAAA" }
        }))
        .unwrap();
        assert_eq!(part, Part::inline_data("image/png", "AAAA"));
    }

    #[test]
    fn text_part_serializes_without_thought_key() {
        let encoded = serde_json::to_value(Part::text("hello")).unwrap();
        assert_eq!(encoded, json!({ "text": "hello" }));
    }
}
