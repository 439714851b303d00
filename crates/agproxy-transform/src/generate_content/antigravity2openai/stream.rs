use agproxy_protocol::antigravity::{Part, StreamGenerateResponse};
use agproxy_protocol::openai::{ToolCall, ToolCallFunction};

/// One caller-facing event decoded from the upstream stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    ReasoningOpen,
    ReasoningText(String),
    ReasoningClose,
    AnswerText(String),
    /// All function-call fragments accumulated since the last flush,
    /// emitted together when the candidate reports a finish reason.
    ToolCalls(Vec<ToolCall>),
}

/// Single-pass decode state carried across events within one request:
/// whether a reasoning run is open, and the pending tool-call batch.
#[derive(Debug, Default)]
pub struct AssistantStreamState {
    in_reasoning: bool,
    pending_tool_calls: Vec<ToolCall>,
}

impl AssistantStreamState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify one parsed upstream event into zero or more caller events,
    /// in arrival order.
    pub fn transform_response(&mut self, response: StreamGenerateResponse) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        let Some(candidate) = response.response.candidates.into_iter().next() else {
            return events;
        };
        let parts = candidate
            .content
            .map(|content| content.parts)
            .unwrap_or_default();

        for part in parts {
            match part {
                Part::Text { text, thought } if thought == Some(true) => {
                    if !self.in_reasoning {
                        events.push(StreamEvent::ReasoningOpen);
                        self.in_reasoning = true;
                    }
                    events.push(StreamEvent::ReasoningText(text));
                }
                Part::Text { text, .. } => {
                    if self.in_reasoning {
                        events.push(StreamEvent::ReasoningClose);
                        self.in_reasoning = false;
                    }
                    events.push(StreamEvent::AnswerText(text));
                }
                Part::FunctionCall { function_call } => {
                    let arguments = serde_json::to_string(&function_call.args)
                        .unwrap_or_else(|_| "{}".to_string());
                    self.pending_tool_calls.push(ToolCall {
                        id: function_call.id.unwrap_or_default(),
                        kind: "function".to_string(),
                        function: ToolCallFunction {
                            name: function_call.name,
                            arguments,
                        },
                    });
                }
                Part::InlineData { .. } | Part::FunctionResponse { .. } => {}
            }
        }

        let finished = candidate
            .finish_reason
            .as_deref()
            .is_some_and(|reason| !reason.is_empty());
        if finished && !self.pending_tool_calls.is_empty() {
            if self.in_reasoning {
                events.push(StreamEvent::ReasoningClose);
                self.in_reasoning = false;
            }
            events.push(StreamEvent::ToolCalls(std::mem::take(
                &mut self.pending_tool_calls,
            )));
        }
        events
    }

    /// Close an open reasoning run at end of stream so every open is
    /// balanced by exactly one close.
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        if self.in_reasoning {
            self.in_reasoning = false;
            vec![StreamEvent::ReasoningClose]
        } else {
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(parts: serde_json::Value, finish_reason: Option<&str>) -> StreamGenerateResponse {
        let mut candidate = json!({ "content": { "parts": parts } });
        if let Some(reason) = finish_reason {
            candidate["finishReason"] = json!(reason);
        }
        serde_json::from_value(json!({ "response": { "candidates": [candidate] } })).unwrap()
    }

    #[test]
    fn reasoning_run_opens_once_and_closes_before_answer_text() {
        let mut state = AssistantStreamState::new();
        let mut events = state.transform_response(event(
            json!([
                { "text": "step one", "thought": true },
                { "text": "step two", "thought": true }
            ]),
            None,
        ));
        events.extend(state.transform_response(event(json!([{ "text": "answer" }]), None)));

        assert_eq!(
            events,
            vec![
                StreamEvent::ReasoningOpen,
                StreamEvent::ReasoningText("step one".to_string()),
                StreamEvent::ReasoningText("step two".to_string()),
                StreamEvent::ReasoningClose,
                StreamEvent::AnswerText("answer".to_string()),
            ]
        );
        assert!(state.finish().is_empty());
    }

    #[test]
    fn end_of_stream_closes_an_open_reasoning_run_exactly_once() {
        let mut state = AssistantStreamState::new();
        let events =
            state.transform_response(event(json!([{ "text": "hm", "thought": true }]), None));
        assert_eq!(
            events,
            vec![
                StreamEvent::ReasoningOpen,
                StreamEvent::ReasoningText("hm".to_string()),
            ]
        );
        assert_eq!(state.finish(), vec![StreamEvent::ReasoningClose]);
        assert!(state.finish().is_empty());
    }

    #[test]
    fn function_calls_batch_until_finish_reason() {
        let mut state = AssistantStreamState::new();
        let mut events = state.transform_response(event(
            json!([
                { "functionCall": { "id": "c1", "name": "a", "args": { "x": 1 } } },
                { "functionCall": { "id": "c2", "name": "b", "args": {} } }
            ]),
            None,
        ));
        assert!(events.is_empty());

        events.extend(state.transform_response(event(
            json!([{ "functionCall": { "id": "c3", "name": "c", "args": {} } }]),
            Some("STOP"),
        )));
        assert_eq!(events.len(), 1);
        match &events[0] {
            StreamEvent::ToolCalls(batch) => {
                assert_eq!(batch.len(), 3);
                assert_eq!(batch[0].id, "c1");
                assert_eq!(batch[0].function.name, "a");
                assert_eq!(batch[0].function.arguments, "{\"x\":1}");
                assert_eq!(batch[2].id, "c3");
            }
            other => panic!("unexpected event: {other:?}"),
        }

        // Batch was flushed; a later finish with nothing pending emits nothing.
        assert!(
            state
                .transform_response(event(json!([]), Some("STOP")))
                .is_empty()
        );
    }

    #[test]
    fn finish_reason_without_pending_calls_emits_nothing() {
        let mut state = AssistantStreamState::new();
        let events = state.transform_response(event(json!([{ "text": "done" }]), Some("STOP")));
        assert_eq!(events, vec![StreamEvent::AnswerText("done".to_string())]);
    }

    #[test]
    fn tool_call_flush_closes_an_open_reasoning_run_first() {
        let mut state = AssistantStreamState::new();
        let events = state.transform_response(event(
            json!([
                { "text": "thinking", "thought": true },
                { "functionCall": { "id": "c1", "name": "a", "args": {} } }
            ]),
            Some("STOP"),
        ));
        assert_eq!(events.len(), 4);
        assert_eq!(events[0], StreamEvent::ReasoningOpen);
        assert_eq!(events[1], StreamEvent::ReasoningText("thinking".to_string()));
        assert_eq!(events[2], StreamEvent::ReasoningClose);
        assert!(matches!(&events[3], StreamEvent::ToolCalls(batch) if batch.len() == 1));
        assert!(state.finish().is_empty());
    }

    #[test]
    fn missing_candidate_yields_no_events() {
        let mut state = AssistantStreamState::new();
        let response: StreamGenerateResponse = serde_json::from_value(json!({})).unwrap();
        assert!(state.transform_response(response).is_empty());
    }
}
