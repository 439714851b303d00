use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::time::Instant;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use http::header::{ACCEPT_ENCODING, CONTENT_TYPE, HOST, USER_AGENT};
use http::StatusCode;
use tracing::{info, warn};

use agproxy_protocol::antigravity::{GenerateAssistantRequest, StreamGenerateResponse};
use agproxy_protocol::sse::{SseLineParser, SsePayload};
use agproxy_transform::generate_content::antigravity2openai::{AssistantStreamState, StreamEvent};

use crate::client::shared_client;
use crate::config::UpstreamConfig;
use crate::error::UpstreamError;

type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, io::Error>> + Send>>;

/// Pull-based decoder over the upstream response body: owns the line
/// buffer, the decode state, and the ready-event queue, and suspends only
/// on transport reads. One instance serves exactly one request.
pub struct AssistantEventStream {
    source: ByteStream,
    parser: SseLineParser,
    state: AssistantStreamState,
    ready: VecDeque<StreamEvent>,
    done: bool,
}

impl AssistantEventStream {
    pub fn new(
        source: impl Stream<Item = Result<Bytes, io::Error>> + Send + 'static,
    ) -> Self {
        Self {
            source: Box::pin(source),
            parser: SseLineParser::new(),
            state: AssistantStreamState::new(),
            ready: VecDeque::new(),
            done: false,
        }
    }

    /// The next decoded event, or `None` once the upstream signalled
    /// completion or the connection closed. Malformed event lines are
    /// logged and skipped; a transport error ends the stream.
    pub async fn next_event(&mut self) -> Result<Option<StreamEvent>, UpstreamError> {
        loop {
            if let Some(event) = self.ready.pop_front() {
                return Ok(Some(event));
            }
            if self.done {
                return Ok(None);
            }
            match self.source.next().await {
                Some(Ok(chunk)) => {
                    for payload in self.parser.push(&chunk) {
                        match payload {
                            SsePayload::Done => {
                                // Terminal sentinel: anything still buffered
                                // is discarded.
                                self.done = true;
                                self.ready.extend(self.state.finish());
                                break;
                            }
                            SsePayload::Data(json) => {
                                match serde_json::from_str::<StreamGenerateResponse>(&json) {
                                    Ok(response) => {
                                        self.ready.extend(self.state.transform_response(response));
                                    }
                                    Err(err) => {
                                        warn!(error = %err, "skipping malformed upstream event line");
                                    }
                                }
                            }
                        }
                    }
                }
                Some(Err(err)) => {
                    self.done = true;
                    return Err(UpstreamError::Stream(err));
                }
                None => {
                    self.done = true;
                    self.ready.extend(self.state.finish());
                }
            }
        }
    }
}

/// Issue the streaming generate call and hand back the event decoder over
/// its body.
pub async fn stream_generate(
    config: &UpstreamConfig,
    access_token: &str,
    body: &GenerateAssistantRequest,
    trace_id: &str,
) -> Result<AssistantEventStream, UpstreamError> {
    let started_at = Instant::now();
    info!(
        event = "upstream_request",
        trace_id = %trace_id,
        op = "assistant.stream_generate",
        model = %body.model,
    );
    let response = shared_client()
        .post(&config.generate_url)
        .header(HOST, &config.host)
        .header(USER_AGENT, &config.user_agent)
        .bearer_auth(access_token)
        .header(CONTENT_TYPE, "application/json")
        .header(ACCEPT_ENCODING, "gzip")
        .json(body)
        .send()
        .await
        .map_err(|err| {
            warn!(
                event = "upstream_response",
                trace_id = %trace_id,
                op = "assistant.stream_generate",
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
        op = "assistant.stream_generate",
        status = %status.as_u16(),
        elapsed_ms = started_at.elapsed().as_millis(),
    );
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::FORBIDDEN {
            return Err(UpstreamError::PermissionDenied { body });
        }
        return Err(UpstreamError::Call { status, body });
    }

    let source = response
        .bytes_stream()
        .map(|item| item.map_err(|err| io::Error::other(err.to_string())));
    Ok(AssistantEventStream::new(source))
}

#[cfg(test)]
mod tests {
    use futures_util::stream;

    use super::*;

    fn byte_stream(chunks: Vec<&'static [u8]>) -> impl Stream<Item = Result<Bytes, io::Error>> {
        stream::iter(
            chunks
                .into_iter()
                .map(|chunk| Ok(Bytes::from_static(chunk))),
        )
    }

    async fn collect(mut events: AssistantEventStream) -> Vec<StreamEvent> {
        let mut out = Vec::new();
        while let Some(event) = events.next_event().await.unwrap() {
            out.push(event);
        }
        out
    }

    const FIXTURE: &[u8] = b"data: {\"response\":{\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"pondering\",\"thought\":true}]}}]}}\n\
data: {\"response\":{\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"hello\"}]}}]}}\n\
data: {\"response\":{\"candidates\":[{\"content\":{\"parts\":[{\"functionCall\":{\"id\":\"c1\",\"name\":\"f\",\"args\":{}}}]},\"finishReason\":\"STOP\"}]}}\n\
data: [DONE]\n";

    fn expected_events() -> Vec<StreamEvent> {
        vec![
            StreamEvent::ReasoningOpen,
            StreamEvent::ReasoningText("pondering".to_string()),
            StreamEvent::ReasoningClose,
            StreamEvent::AnswerText("hello".to_string()),
            StreamEvent::ToolCalls(vec![agproxy_protocol::openai::ToolCall {
                id: "c1".to_string(),
                kind: "function".to_string(),
                function: agproxy_protocol::openai::ToolCallFunction {
                    name: "f".to_string(),
                    arguments: "{}".to_string(),
                },
            }]),
        ]
    }

    #[tokio::test]
    async fn whole_stream_decodes_in_order() {
        let events = AssistantEventStream::new(byte_stream(vec![FIXTURE]));
        assert_eq!(collect(events).await, expected_events());
    }

    #[tokio::test]
    async fn arbitrary_chunk_splits_yield_identical_events() {
        // Split at every byte boundary in a sparse sweep, including
        // boundaries inside lines and inside the `data: ` prefix.
        for split in (1..FIXTURE.len()).step_by(7) {
            let (head, tail) = FIXTURE.split_at(split);
            let events = AssistantEventStream::new(byte_stream(vec![head, tail]));
            assert_eq!(collect(events).await, expected_events(), "split at {split}");
        }
    }

    #[tokio::test]
    async fn one_byte_at_a_time_yields_identical_events() {
        let chunks: Vec<&'static [u8]> = FIXTURE.chunks(1).collect();
        let events = AssistantEventStream::new(byte_stream(chunks));
        assert_eq!(collect(events).await, expected_events());
    }

    #[tokio::test]
    async fn malformed_lines_are_skipped_not_fatal() {
        let events = AssistantEventStream::new(byte_stream(vec![
            b"data: {not json}\n",
            b"data: {\"response\":{\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"ok\"}]}}]}}\n",
        ]));
        assert_eq!(
            collect(events).await,
            vec![StreamEvent::AnswerText("ok".to_string())]
        );
    }

    #[tokio::test]
    async fn done_sentinel_discards_everything_after_it() {
        let events = AssistantEventStream::new(byte_stream(vec![
            b"data: [DONE]\ndata: {\"response\":{\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"late\"}]}}]}}\n",
        ]));
        assert!(collect(events).await.is_empty());
    }

    #[tokio::test]
    async fn connection_close_balances_an_open_reasoning_run() {
        let events = AssistantEventStream::new(byte_stream(vec![
            b"data: {\"response\":{\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"hm\",\"thought\":true}]}}]}}\n",
        ]));
        assert_eq!(
            collect(events).await,
            vec![
                StreamEvent::ReasoningOpen,
                StreamEvent::ReasoningText("hm".to_string()),
                StreamEvent::ReasoningClose,
            ]
        );
    }

    #[tokio::test]
    async fn transport_error_ends_the_stream_with_an_error() {
        let source = stream::iter(vec![
            Ok(Bytes::from_static(
                b"data: {\"response\":{\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"a\"}]}}]}}\n",
            )),
            Err(io::Error::other("reset by peer")),
        ]);
        let mut events = AssistantEventStream::new(source);
        assert_eq!(
            events.next_event().await.unwrap(),
            Some(StreamEvent::AnswerText("a".to_string()))
        );
        assert!(matches!(
            events.next_event().await,
            Err(UpstreamError::Stream(_))
        ));
        assert_eq!(events.next_event().await.unwrap(), None);
    }
}
