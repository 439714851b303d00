use serde_json::{json, Value as JsonValue};
use uuid::Uuid;

use agproxy_protocol::antigravity::{
    AssistantRequest, Content, ContentRole, FunctionDeclaration, GenerateAssistantRequest,
    GenerationConfig, Part, ThinkingConfig, ToolConfig, ToolDeclarations,
};
use agproxy_protocol::openai::{
    ChatMessage, ContentItem, CreateChatCompletionRequest, MessageContent, Role, Tool,
};

/// Baseline behavior preamble attached to every upstream request; not
/// caller-overridable.
const SYSTEM_INSTRUCTION: &str = "You are a helpful, respectful and honest assistant. \
Always answer as helpfully as possible, while being safe. \
Your answers should not include any harmful, unethical, racist, sexist, \
toxic, dangerous, or illegal content. Please ensure that your responses \
are socially unbiased and positive in nature.\n\n\
If a question does not make any sense, or is not factually coherent, \
explain why instead of answering something not correct. If you don't know \
the answer to a question, please don't share false information.";

const STOP_SEQUENCES: [&str; 5] = [
    "<|user|>",
    "<|bot|>",
    "<|context_request|>",
    "<|endoftext|>",
    "<|end_of_turn|>",
];

const DEFAULT_TOP_P: f64 = 0.95;
const DEFAULT_TOP_K: i64 = 40;
const DEFAULT_TEMPERATURE: f64 = 0.7;
const DEFAULT_MAX_TOKENS: i64 = 2048;
const THINKING_BUDGET: i64 = 1024;

/// Build the upstream generate payload from a caller conversation and the
/// selected credential's upstream identifiers.
pub fn transform_request(
    request: CreateChatCompletionRequest,
    project_id: Option<&str>,
    session_id: Option<&str>,
) -> GenerateAssistantRequest {
    let enable_thinking = thinking_enabled(&request.model);
    let model = effective_model_name(&request.model).to_string();
    let generation_config = build_generation_config(&request, enable_thinking, &model);
    let contents = convert_messages(&request.messages);
    let (tools, tool_config) = match request.tools.as_deref() {
        Some(tools) if !tools.is_empty() => (
            Some(convert_tools(tools)),
            // Upstream must call a function whenever any are declared.
            Some(ToolConfig::function_calling("ANY")),
        ),
        _ => (None, None),
    };

    GenerateAssistantRequest {
        request_id: format!("req_{}", Uuid::new_v4().simple()),
        request: AssistantRequest {
            contents,
            system_instruction: Content {
                role: ContentRole::User,
                parts: vec![Part::text(SYSTEM_INSTRUCTION)],
            },
            tools,
            tool_config,
            generation_config,
            session_id: session_id.map(str::to_string),
        },
        model,
        user_agent: "antigravity".to_string(),
        project: project_id.map(str::to_string),
    }
}

/// Extended reasoning is driven by the model name: an explicit `-thinking`
/// suffix or one of the identifiers known to always think.
fn thinking_enabled(model: &str) -> bool {
    model.ends_with("-thinking")
        || model == "gemini-2.5-pro"
        || model.starts_with("gemini-3-pro-")
        || matches!(model, "rev19-uic3-1p" | "gpt-oss-120b-medium")
}

fn effective_model_name(model: &str) -> &str {
    model.strip_suffix("-thinking").unwrap_or(model)
}

fn build_generation_config(
    request: &CreateChatCompletionRequest,
    enable_thinking: bool,
    effective_model: &str,
) -> GenerationConfig {
    // Vendor quirk: claude-backed models reject topP while thinking, so the
    // field is omitted entirely rather than defaulted.
    let top_p = if enable_thinking && effective_model.contains("claude") {
        None
    } else {
        Some(request.top_p.unwrap_or(DEFAULT_TOP_P))
    };
    GenerationConfig {
        top_p,
        top_k: request.top_k.unwrap_or(DEFAULT_TOP_K),
        temperature: request.temperature.unwrap_or(DEFAULT_TEMPERATURE),
        candidate_count: 1,
        max_output_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        stop_sequences: STOP_SEQUENCES.iter().map(|s| s.to_string()).collect(),
        thinking_config: ThinkingConfig {
            include_thoughts: enable_thinking,
            thinking_budget: if enable_thinking { THINKING_BUDGET } else { 0 },
        },
    }
}

fn convert_tools(tools: &[Tool]) -> Vec<ToolDeclarations> {
    tools
        .iter()
        .map(|tool| {
            let mut parameters = tool.function.parameters.clone().unwrap_or_else(|| json!({}));
            if let Some(object) = parameters.as_object_mut() {
                object.remove("$schema");
            }
            ToolDeclarations {
                function_declarations: vec![FunctionDeclaration {
                    name: tool.function.name.clone(),
                    description: tool.function.description.clone(),
                    parameters,
                }],
            }
        })
        .collect()
}

/// Sequential fold of caller turns into upstream turns. System and user
/// turns always open a new `user` turn; assistant and tool turns may merge
/// into the previous turn per the continuation rules below.
pub fn convert_messages(messages: &[ChatMessage]) -> Vec<Content> {
    let mut contents: Vec<Content> = Vec::new();
    for message in messages {
        match message.role {
            Role::System | Role::User => push_user_turn(message, &mut contents),
            Role::Assistant => push_assistant_turn(message, &mut contents),
            Role::Tool => push_tool_result(message, &mut contents),
        }
    }
    contents
}

struct ExtractedContent {
    text: String,
    images: Vec<Part>,
}

fn extract_content(content: Option<&MessageContent>) -> ExtractedContent {
    let mut extracted = ExtractedContent {
        text: String::new(),
        images: Vec::new(),
    };
    match content {
        None => {}
        Some(MessageContent::Text(text)) => extracted.text.push_str(text),
        Some(MessageContent::Items(items)) => {
            for item in items {
                match item {
                    ContentItem::Text { text } => extracted.text.push_str(text),
                    ContentItem::ImageUrl { image_url } => {
                        // Items whose URL is not an image data URI are
                        // silently dropped.
                        if let Some((subtype, data)) = parse_image_data_uri(&image_url.url) {
                            extracted
                                .images
                                .push(Part::inline_data(format!("image/{subtype}"), data));
                        }
                    }
                    ContentItem::Unknown => {}
                }
            }
        }
    }
    extracted
}

/// Recognizes `data:image/<subtype>;base64,<data>` with a word-character
/// subtype and non-empty payload.
fn parse_image_data_uri(url: &str) -> Option<(&str, &str)> {
    let rest = url.strip_prefix("data:image/")?;
    let (subtype, data) = rest.split_once(";base64,")?;
    if subtype.is_empty()
        || data.is_empty()
        || !subtype
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return None;
    }
    Some((subtype, data))
}

fn push_user_turn(message: &ChatMessage, contents: &mut Vec<Content>) {
    let extracted = extract_content(message.content.as_ref());
    let mut parts = vec![Part::text(extracted.text)];
    parts.extend(extracted.images);
    contents.push(Content {
        role: ContentRole::User,
        parts,
    });
}

fn push_assistant_turn(message: &ChatMessage, contents: &mut Vec<Content>) {
    let text = extract_content(message.content.as_ref()).text;
    let has_text = !text.trim().is_empty();

    let mut invocation_parts = Vec::new();
    for call in message.tool_calls.iter().flatten() {
        // The caller's arguments arrive JSON-encoded; an unparsable string
        // degrades to a single `query` field holding the raw text.
        let args = match serde_json::from_str::<JsonValue>(&call.function.arguments) {
            Ok(value) => value,
            Err(_) => json!({ "query": call.function.arguments }),
        };
        invocation_parts.push(Part::function_call(
            call.id.clone(),
            call.function.name.clone(),
            args,
        ));
    }

    // A tool-call-only assistant turn continues the preceding model turn:
    // multi-step reasoning-then-call patterns arrive as separate caller
    // turns but are one upstream turn.
    if !invocation_parts.is_empty() && !has_text {
        if let Some(last) = contents.last_mut() {
            if last.role == ContentRole::Model {
                last.parts.extend(invocation_parts);
                return;
            }
        }
    }

    let mut parts = Vec::new();
    if has_text {
        parts.push(Part::text(text));
    }
    parts.extend(invocation_parts);
    if !parts.is_empty() {
        contents.push(Content {
            role: ContentRole::Model,
            parts,
        });
    }
}

fn push_tool_result(message: &ChatMessage, contents: &mut Vec<Content>) {
    let call_id = message.tool_call_id.clone().unwrap_or_default();
    let name = resolve_function_name(contents, &call_id);
    let output = extract_content(message.content.as_ref()).text;
    let part = Part::function_response(call_id, name, json!({ "output": output }));

    // Consecutive tool results collapse into the trailing user turn.
    if let Some(last) = contents.last_mut() {
        if last.role == ContentRole::User && last.parts.iter().any(Part::is_function_response) {
            last.parts.push(part);
            return;
        }
    }
    contents.push(Content {
        role: ContentRole::User,
        parts: vec![part],
    });
}

/// Backward scan for the invocation this result answers. An unmatched id
/// resolves to an empty name, mirroring the upstream contract.
fn resolve_function_name(contents: &[Content], call_id: &str) -> String {
    for content in contents.iter().rev() {
        if content.role != ContentRole::Model {
            continue;
        }
        for part in &content.parts {
            if let Part::FunctionCall { function_call } = part {
                if function_call.id.as_deref() == Some(call_id) {
                    return function_call.name.clone();
                }
            }
        }
    }
    String::new()
}
