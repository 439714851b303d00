use std::convert::Infallible;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderValue};
use serde::Serialize;
use time::OffsetDateTime;
use tracing::error;
use uuid::Uuid;

use agproxy_protocol::openai::{
    ChatCompletionChunk, ChatCompletionResponse, ChunkDelta, CreateChatCompletionRequest,
    ResponseChoice, ResponseMessage, ToolCall,
};
use agproxy_transform::generate_content::antigravity2openai::StreamEvent;
use agproxy_transform::generate_content::openai2antigravity::request::transform_request;
use agproxy_transform::list_models::antigravity2openai::response::transform_response as transform_models;
use agproxy_upstream::{fetch_models, stream_generate, AssistantEventStream, UpstreamError};

use crate::auth::verify_api_key;
use crate::core::CoreState;
use crate::error::ProxyError;

pub async fn chat_completions(
    State(state): State<Arc<CoreState>>,
    headers: HeaderMap,
    Json(request): Json<CreateChatCompletionRequest>,
) -> Response {
    if let Err(err) = verify_api_key(&state, &headers) {
        return err.into_response();
    }
    if request.stream {
        stream_completion(state, request)
    } else {
        aggregate_completion(state, request).await
    }
}

pub async fn list_models(State(state): State<Arc<CoreState>>, headers: HeaderMap) -> Response {
    if let Err(err) = verify_api_key(&state, &headers) {
        return err.into_response();
    }
    let trace_id = format!("models-{}", Uuid::new_v4().simple());
    let Some(credential) = state.rotation.get_token().await else {
        return ProxyError::from(&UpstreamError::NoCredentialAvailable).into_response();
    };
    match fetch_models(&state.upstream, &credential.access_token, &trace_id).await {
        Ok(models) => {
            let created = OffsetDateTime::now_utc().unix_timestamp();
            Json(transform_models(models, created)).into_response()
        }
        Err(err) => {
            error!(trace_id = %trace_id, error = %err, "model listing failed");
            ProxyError::from(&err).into_response()
        }
    }
}

/// Acquire a rotated credential, translate the conversation, and open the
/// upstream event stream.
async fn open_stream(
    state: &CoreState,
    request: CreateChatCompletionRequest,
    trace_id: &str,
) -> Result<AssistantEventStream, UpstreamError> {
    let credential = state
        .rotation
        .get_token()
        .await
        .ok_or(UpstreamError::NoCredentialAvailable)?;
    let body = transform_request(
        request,
        credential.project_id.as_deref(),
        credential.session_id.as_deref(),
    );
    stream_generate(&state.upstream, &credential.access_token, &body, trace_id).await
}

/// Streaming mode: the response opens immediately and every failure after
/// that point is delivered in-band as a final `error` chunk before `[DONE]`.
fn stream_completion(state: Arc<CoreState>, request: CreateChatCompletionRequest) -> Response {
    let request_id = format!("chatcmpl-{}", Uuid::new_v4().simple());
    let created = OffsetDateTime::now_utc().unix_timestamp();
    let model = request.model.clone();

    let frames = async_stream::stream! {
        match open_stream(&state, request, &request_id).await {
            Err(err) => {
                error!(trace_id = %request_id, error = %err, "failed to open upstream stream");
                yield Ok::<Bytes, Infallible>(sse_json_frame(&error_chunk(
                    &request_id, created, &model, &err,
                )));
            }
            Ok(mut events) => {
                let mut saw_tool_calls = false;
                loop {
                    match events.next_event().await {
                        Ok(Some(event)) => {
                            let delta = delta_for_event(event, &mut saw_tool_calls);
                            yield Ok(sse_json_frame(&ChatCompletionChunk::new(
                                &request_id, created, &model, delta,
                            )));
                        }
                        Ok(None) => {
                            let finish_reason = if saw_tool_calls { "tool_calls" } else { "stop" };
                            yield Ok(sse_json_frame(&ChatCompletionChunk::finish(
                                &request_id, created, &model, finish_reason,
                            )));
                            break;
                        }
                        Err(err) => {
                            error!(trace_id = %request_id, error = %err, "upstream stream failed");
                            yield Ok(sse_json_frame(&error_chunk(
                                &request_id, created, &model, &err,
                            )));
                            break;
                        }
                    }
                }
            }
        }
        yield Ok(Bytes::from_static(b"data: [DONE]\n\n"));
    };

    let mut response = Response::new(Body::from_stream(frames));
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/event-stream"),
    );
    response
}

/// Aggregated mode: drain the decoder, concatenating answer text and
/// keeping the last tool-call batch. Reasoning chunks are not part of the
/// aggregated content.
async fn aggregate_completion(
    state: Arc<CoreState>,
    request: CreateChatCompletionRequest,
) -> Response {
    let request_id = format!("chatcmpl-{}", Uuid::new_v4().simple());
    let created = OffsetDateTime::now_utc().unix_timestamp();
    let model = request.model.clone();

    let mut events = match open_stream(&state, request, &request_id).await {
        Ok(events) => events,
        Err(err) => {
            error!(trace_id = %request_id, error = %err, "failed to open upstream stream");
            return ProxyError::from(&err).into_response();
        }
    };

    let mut content = String::new();
    let mut tool_calls: Vec<ToolCall> = Vec::new();
    loop {
        match events.next_event().await {
            Ok(Some(StreamEvent::AnswerText(text))) => content.push_str(&text),
            Ok(Some(StreamEvent::ToolCalls(batch))) => tool_calls = batch,
            Ok(Some(_)) => {}
            Ok(None) => break,
            Err(err) => {
                error!(trace_id = %request_id, error = %err, "upstream stream failed");
                return ProxyError::from(&err).into_response();
            }
        }
    }

    let finish_reason = if tool_calls.is_empty() { "stop" } else { "tool_calls" };
    let response = ChatCompletionResponse {
        id: request_id,
        object: "chat.completion",
        created,
        model,
        choices: vec![ResponseChoice {
            index: 0,
            message: ResponseMessage {
                role: "assistant",
                content,
                tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
            },
            finish_reason,
        }],
    };
    Json(response).into_response()
}

/// Map one decoded event onto the OpenAI delta channel. Reasoning is
/// rendered into the content stream bracketed by `<think>` markers.
fn delta_for_event(event: StreamEvent, saw_tool_calls: &mut bool) -> ChunkDelta {
    match event {
        StreamEvent::ReasoningOpen => ChunkDelta {
            content: Some("<think>\n".to_string()),
            tool_calls: None,
        },
        StreamEvent::ReasoningText(text) => ChunkDelta {
            content: Some(text),
            tool_calls: None,
        },
        StreamEvent::ReasoningClose => ChunkDelta {
            content: Some("\n</think>\n".to_string()),
            tool_calls: None,
        },
        StreamEvent::AnswerText(text) => ChunkDelta {
            content: Some(text),
            tool_calls: None,
        },
        StreamEvent::ToolCalls(batch) => {
            *saw_tool_calls = true;
            ChunkDelta {
                content: None,
                tool_calls: Some(batch),
            }
        }
    }
}

fn error_chunk(
    request_id: &str,
    created: i64,
    model: &str,
    err: &UpstreamError,
) -> ChatCompletionChunk {
    let mut chunk = ChatCompletionChunk::new(
        request_id,
        created,
        model,
        ChunkDelta {
            content: Some(format!("Error: {err}")),
            tool_calls: None,
        },
    );
    chunk.choices[0].finish_reason = Some("error");
    chunk
}

fn sse_json_frame<T: Serialize>(value: &T) -> Bytes {
    Bytes::from(format!(
        "data: {}\n\n",
        serde_json::to_string(value).unwrap_or_default()
    ))
}
