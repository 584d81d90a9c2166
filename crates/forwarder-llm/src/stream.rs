//! Chat completion stream translation
//!
//! Turns a backend event stream into `chat.completion.chunk` frames that a
//! strict client accepts: the role on the first chunk, deltas only while
//! streaming, a single finishing chunk carrying `finish_reason` and usage,
//! then exactly one `[DONE]`. Backend finish signals and sentinels are
//! absorbed; the translator alone decides when the stream ends.
//!
//! ```text
//! Streaming --(backend done | backend error | backend eof)--> Finishing --> Closed
//! ```

use std::collections::VecDeque;

use forwarder_core::{ErrorBody, HttpError};
use forwarder_registry::ModelCapability;
use futures_util::{Stream, StreamExt, stream};
use serde::Serialize;

use crate::convert::openai::finish_reason_str;
use crate::error::LlmError;
use crate::normalize::{EMPTY_CONTENT_FALLBACK, completion_id, unix_now};
use crate::protocol::openai::{
    OpenAiStreamChoice, OpenAiStreamChunk, OpenAiStreamDelta, OpenAiStreamFunctionCall, OpenAiStreamToolCall,
    OpenAiUsage,
};
use crate::provider::EventStream;
use crate::types::{BackendReply, FinishReason, StreamDelta, StreamEvent, StreamToolCall};

/// Terminal SSE data payload for chat streams
pub const DONE_SENTINEL: &str = "[DONE]";

/// Stateful rewriter from backend events to client frames
///
/// Every method returns the frames to emit, in order. Once closed, a
/// translator accepts nothing and emits nothing.
pub trait Translator {
    /// Client-facing frame type
    type Frame;

    /// Handle one backend event
    fn on_event(&mut self, event: StreamEvent) -> Vec<Self::Frame>;

    /// Handle a backend failure mid-stream
    fn on_error(&mut self, error: &LlmError) -> Vec<Self::Frame>;

    /// Backend stream ended; emit the closing frames if not already closed
    fn finish(&mut self) -> Vec<Self::Frame>;

    /// Whether the closing frames have been emitted
    fn is_closed(&self) -> bool;
}

/// Drive a translator over a backend stream
///
/// The backend stream is polled only while the translator is open, and is
/// dropped (closing the upstream connection) when the returned stream is.
pub fn translate<T>(events: EventStream, translator: T) -> impl Stream<Item = T::Frame> + Send
where
    T: Translator + Send + 'static,
    T::Frame: Send + 'static,
{
    stream::unfold(
        (events, translator, VecDeque::new()),
        |(mut events, mut translator, mut pending)| async move {
            loop {
                if let Some(frame) = pending.pop_front() {
                    return Some((frame, (events, translator, pending)));
                }

                if translator.is_closed() {
                    return None;
                }

                let frames = match events.next().await {
                    Some(Ok(event)) => translator.on_event(event),
                    Some(Err(error)) => translator.on_error(&error),
                    None => translator.finish(),
                };
                pending.extend(frames);
            }
        },
    )
}

/// One SSE frame of a chat completion stream
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ChatFrame {
    /// `chat.completion.chunk`
    Chunk(OpenAiStreamChunk),
    /// Error envelope sent before closing a failed stream
    Error(ErrorBody),
    /// `[DONE]`
    #[serde(skip)]
    Done,
}

impl ChatFrame {
    /// SSE `data:` payload for this frame
    pub fn data(&self) -> Result<String, serde_json::Error> {
        match self {
            Self::Done => Ok(DONE_SENTINEL.to_owned()),
            frame => serde_json::to_string(frame),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Streaming,
    Finishing,
    Closed,
}

/// Translator producing `OpenAI` chat chunks
#[derive(Debug)]
pub struct ChatStreamTranslator {
    id: String,
    model: String,
    created: u64,
    reasoning: bool,
    state: State,
    role_sent: bool,
    content_emitted: bool,
    tool_calls_seen: bool,
    usage: Option<crate::types::Usage>,
}

impl ChatStreamTranslator {
    /// Translator for `model` (client-facing id) with the given capability
    pub fn new(model: impl Into<String>, cap: &ModelCapability) -> Self {
        Self {
            id: completion_id(),
            model: model.into(),
            created: unix_now(),
            reasoning: cap.reasoning,
            state: State::Streaming,
            role_sent: false,
            content_emitted: false,
            tool_calls_seen: false,
            usage: None,
        }
    }

    /// Replay a complete backend reply as a stream
    ///
    /// Used when the model cannot stream: one chunk carrying the whole
    /// normalized message, `finish_reason`, and usage, then `[DONE]`.
    pub fn replay(mut self, reply: BackendReply) -> Vec<ChatFrame> {
        let has_tool_calls = reply.has_tool_calls();
        let tool_calls = has_tool_calls.then(|| {
            reply
                .tool_calls
                .into_iter()
                .zip(0u32..)
                .map(|(call, index)| OpenAiStreamToolCall {
                    index,
                    id: Some(call.id),
                    tool_type: Some(call.tool_type),
                    function: Some(OpenAiStreamFunctionCall {
                        name: Some(call.function.name),
                        arguments: Some(call.function.arguments),
                    }),
                })
                .collect()
        });

        let content = if has_tool_calls {
            None
        } else {
            Some(reply.content.filter(|c| !c.is_empty()).unwrap_or_else(|| {
                tracing::debug!("degenerate reply repaired with placeholder content");
                EMPTY_CONTENT_FALLBACK.to_owned()
            }))
        };

        let delta = OpenAiStreamDelta {
            role: Some("assistant".to_owned()),
            content,
            reasoning_content: reply.reasoning.filter(|r| self.reasoning && !r.is_empty()),
            tool_calls,
        };

        let finish = if has_tool_calls { FinishReason::ToolCalls } else { FinishReason::Stop };
        let chunk = self.chunk(delta, Some(finish), Some(reply.usage.unwrap_or_default()));

        self.role_sent = true;
        self.state = State::Closed;
        vec![ChatFrame::Chunk(chunk), ChatFrame::Done]
    }

    fn chunk(
        &self,
        delta: OpenAiStreamDelta,
        finish: Option<FinishReason>,
        usage: Option<crate::types::Usage>,
    ) -> OpenAiStreamChunk {
        OpenAiStreamChunk {
            id: self.id.clone(),
            object: "chat.completion.chunk".to_owned(),
            created: self.created,
            model: self.model.clone(),
            choices: vec![OpenAiStreamChoice {
                index: 0,
                delta,
                finish_reason: finish.map(|f| finish_reason_str(f).to_owned()),
            }],
            usage: usage.map(|u| OpenAiUsage::from(u.with_total())),
        }
    }

    fn take_role(&mut self) -> Option<String> {
        (!std::mem::replace(&mut self.role_sent, true)).then(|| "assistant".to_owned())
    }

    fn on_delta(&mut self, delta: StreamDelta) -> Vec<ChatFrame> {
        let content = delta.content.filter(|c| !c.is_empty());
        let reasoning = delta.reasoning.filter(|r| self.reasoning && !r.is_empty());
        let tool_call = delta.tool_call.map(wire_tool_call);

        if content.is_none() && reasoning.is_none() && tool_call.is_none() {
            return Vec::new();
        }

        self.content_emitted |= content.is_some();
        self.tool_calls_seen |= tool_call.is_some();

        let delta = OpenAiStreamDelta {
            role: self.take_role(),
            content,
            reasoning_content: reasoning,
            tool_calls: tool_call.map(|tc| vec![tc]),
        };

        vec![ChatFrame::Chunk(self.chunk(delta, None, None))]
    }
}

impl Translator for ChatStreamTranslator {
    type Frame = ChatFrame;

    fn on_event(&mut self, event: StreamEvent) -> Vec<ChatFrame> {
        if self.state != State::Streaming {
            return Vec::new();
        }

        match event {
            StreamEvent::Delta(delta) => self.on_delta(delta),
            StreamEvent::Usage(usage) => {
                self.usage = Some(usage);
                Vec::new()
            }
            StreamEvent::Done => self.finish(),
        }
    }

    fn on_error(&mut self, error: &LlmError) -> Vec<ChatFrame> {
        if self.state != State::Streaming {
            return Vec::new();
        }

        tracing::warn!(model = %self.model, error = %error, "backend stream failed");

        let mut frames = vec![ChatFrame::Error(error.to_body())];
        frames.extend(self.finish());
        frames
    }

    fn finish(&mut self) -> Vec<ChatFrame> {
        if self.state != State::Streaming {
            return Vec::new();
        }
        self.state = State::Finishing;

        let content = if !self.content_emitted && !self.tool_calls_seen {
            tracing::debug!(model = %self.model, "stream produced no content, emitting placeholder");
            Some(EMPTY_CONTENT_FALLBACK.to_owned())
        } else {
            None
        };

        let delta = OpenAiStreamDelta {
            role: self.take_role(),
            content,
            ..OpenAiStreamDelta::default()
        };
        let finish = if self.tool_calls_seen { FinishReason::ToolCalls } else { FinishReason::Stop };
        let chunk = self.chunk(delta, Some(finish), Some(self.usage.unwrap_or_default()));

        self.state = State::Closed;
        vec![ChatFrame::Chunk(chunk), ChatFrame::Done]
    }

    fn is_closed(&self) -> bool {
        self.state == State::Closed
    }
}

impl Drop for ChatStreamTranslator {
    fn drop(&mut self) {
        if self.state != State::Closed {
            tracing::debug!(model = %self.model, "client disconnected before stream completed");
        }
    }
}

fn wire_tool_call(call: StreamToolCall) -> OpenAiStreamToolCall {
    OpenAiStreamToolCall {
        index: call.index,
        tool_type: call.id.is_some().then(|| "function".to_owned()),
        id: call.id,
        function: call.function.map(|f| OpenAiStreamFunctionCall {
            name: f.name,
            arguments: f.arguments,
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use forwarder_registry::ModelKind;

    use super::*;
    use crate::types::{StreamFunctionCall, ToolCall, Usage};

    fn cap(reasoning: bool) -> ModelCapability {
        ModelCapability {
            model_id: "llama".to_owned(),
            streaming: true,
            tools: true,
            reasoning,
            provider: None,
            upstream_model: None,
            kind: ModelKind::Chat,
        }
    }

    fn events(items: Vec<Result<StreamEvent, LlmError>>) -> EventStream {
        Box::pin(futures_util::stream::iter(items))
    }

    async fn collect(items: Vec<Result<StreamEvent, LlmError>>, reasoning: bool) -> Vec<ChatFrame> {
        translate(events(items), ChatStreamTranslator::new("llama", &cap(reasoning)))
            .collect()
            .await
    }

    fn chunks(frames: &[ChatFrame]) -> Vec<&OpenAiStreamChunk> {
        frames
            .iter()
            .filter_map(|f| match f {
                ChatFrame::Chunk(c) => Some(c),
                _ => None,
            })
            .collect()
    }

    fn done_count(frames: &[ChatFrame]) -> usize {
        frames.iter().filter(|f| matches!(f, ChatFrame::Done)).count()
    }

    fn text(s: &str) -> Result<StreamEvent, LlmError> {
        Ok(StreamEvent::Delta(StreamDelta::content(s)))
    }

    #[tokio::test]
    async fn text_stream_shape() {
        let frames = collect(
            vec![
                text("Hel"),
                text("lo"),
                Ok(StreamEvent::Delta(StreamDelta {
                    finish_reason: Some(FinishReason::Length),
                    ..StreamDelta::default()
                })),
                Ok(StreamEvent::Usage(Usage {
                    prompt_tokens: 5,
                    completion_tokens: 2,
                    ..Usage::default()
                })),
                Ok(StreamEvent::Done),
            ],
            false,
        )
        .await;

        assert_eq!(done_count(&frames), 1);
        assert!(matches!(frames.last(), Some(ChatFrame::Done)));

        let chunks = chunks(&frames);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].choices[0].delta.role.as_deref(), Some("assistant"));
        assert!(chunks[1].choices[0].delta.role.is_none());

        let finish: Vec<_> = chunks.iter().map(|c| c.choices[0].finish_reason.as_deref()).collect();
        assert_eq!(finish, vec![None, None, Some("stop")]);

        let last = chunks[2];
        assert!(last.choices[0].delta.content.is_none());
        let usage = last.usage.as_ref().unwrap();
        assert_eq!(usage.total_tokens, 7);

        assert!(chunks.iter().all(|c| c.id == chunks[0].id && c.object == "chat.completion.chunk"));
    }

    #[tokio::test]
    async fn content_chunks_have_null_finish_reason_on_the_wire() {
        let frames = collect(vec![text("hi"), Ok(StreamEvent::Done)], false).await;

        let value: serde_json::Value = serde_json::from_str(&frames[0].data().unwrap()).unwrap();
        assert!(value["choices"][0]["finish_reason"].is_null());
        assert_eq!(value["choices"][0]["delta"]["content"], "hi");
        assert!(value.get("usage").is_none());
    }

    #[tokio::test]
    async fn empty_stream_gets_placeholder() {
        let frames = collect(vec![Ok(StreamEvent::Done)], false).await;

        let chunks = chunks(&frames);
        assert_eq!(chunks.len(), 1);
        let delta = &chunks[0].choices[0].delta;
        assert_eq!(delta.role.as_deref(), Some("assistant"));
        assert_eq!(delta.content.as_deref(), Some(" "));
        assert_eq!(chunks[0].choices[0].finish_reason.as_deref(), Some("stop"));
        assert_eq!(chunks[0].usage.as_ref().unwrap().total_tokens, 0);
        assert_eq!(done_count(&frames), 1);
    }

    #[tokio::test]
    async fn eof_without_done_still_closes() {
        let frames = collect(vec![text("partial")], false).await;

        assert_eq!(done_count(&frames), 1);
        assert_eq!(chunks(&frames).len(), 2);
    }

    #[tokio::test]
    async fn events_after_done_are_ignored() {
        let frames = collect(vec![text("a"), Ok(StreamEvent::Done), text("b"), Ok(StreamEvent::Done)], false).await;

        assert_eq!(done_count(&frames), 1);
        assert_eq!(chunks(&frames).len(), 2);
    }

    #[tokio::test]
    async fn tool_call_stream_finishes_with_tool_calls() {
        let frames = collect(
            vec![
                Ok(StreamEvent::Delta(StreamDelta {
                    tool_call: Some(StreamToolCall {
                        index: 0,
                        id: Some("call_1".to_owned()),
                        function: Some(StreamFunctionCall {
                            name: Some("lookup".to_owned()),
                            arguments: Some(String::new()),
                        }),
                    }),
                    ..StreamDelta::default()
                })),
                Ok(StreamEvent::Delta(StreamDelta {
                    tool_call: Some(StreamToolCall {
                        index: 0,
                        id: None,
                        function: Some(StreamFunctionCall {
                            name: None,
                            arguments: Some(r#"{"q":1}"#.to_owned()),
                        }),
                    }),
                    ..StreamDelta::default()
                })),
                Ok(StreamEvent::Done),
            ],
            false,
        )
        .await;

        let chunks = chunks(&frames);
        let first = &chunks[0].choices[0].delta.tool_calls.as_ref().unwrap()[0];
        assert_eq!(first.tool_type.as_deref(), Some("function"));
        assert_eq!(first.id.as_deref(), Some("call_1"));

        let last = chunks.last().unwrap();
        assert_eq!(last.choices[0].finish_reason.as_deref(), Some("tool_calls"));
        assert!(last.choices[0].delta.content.is_none());
    }

    #[tokio::test]
    async fn reasoning_is_gated() {
        let delta = || {
            Ok(StreamEvent::Delta(StreamDelta {
                reasoning: Some("hmm".to_owned()),
                ..StreamDelta::default()
            }))
        };

        let with = collect(vec![delta(), text("x")], true).await;
        assert_eq!(chunks(&with)[0].choices[0].delta.reasoning_content.as_deref(), Some("hmm"));

        let without = collect(vec![delta(), text("x")], false).await;
        assert!(chunks(&without).iter().all(|c| c.choices[0].delta.reasoning_content.is_none()));
    }

    #[tokio::test]
    async fn upstream_error_emits_envelope_then_closes() {
        let frames = collect(vec![text("par"), Err(LlmError::Streaming("connection reset".to_owned()))], false).await;

        assert_eq!(frames.len(), 4);
        assert!(matches!(frames[0], ChatFrame::Chunk(_)));
        let ChatFrame::Error(body) = &frames[1] else {
            panic!("expected error frame");
        };
        assert_eq!(body.error.error_type, "streaming_error");
        assert!(matches!(frames[2], ChatFrame::Chunk(_)));
        assert!(matches!(frames[3], ChatFrame::Done));
        assert_eq!(frames[3].data().unwrap(), "[DONE]");
    }

    #[test]
    fn replay_degraded_reply() {
        let reply = BackendReply {
            content: Some("The answer is 42.".to_owned()),
            reasoning: Some("compute".to_owned()),
            usage: Some(Usage {
                prompt_tokens: 4,
                completion_tokens: 6,
                ..Usage::default()
            }),
            ..BackendReply::default()
        };

        let frames = ChatStreamTranslator::new("gpt-oss-120b", &cap(true)).replay(reply);

        assert_eq!(frames.len(), 2);
        assert!(matches!(frames[1], ChatFrame::Done));
        let ChatFrame::Chunk(chunk) = &frames[0] else {
            panic!("expected chunk");
        };
        let choice = &chunk.choices[0];
        assert_eq!(choice.delta.role.as_deref(), Some("assistant"));
        assert_eq!(choice.delta.content.as_deref(), Some("The answer is 42."));
        assert_eq!(choice.delta.reasoning_content.as_deref(), Some("compute"));
        assert_eq!(choice.finish_reason.as_deref(), Some("stop"));
        assert_eq!(chunk.usage.as_ref().unwrap().total_tokens, 10);
    }

    #[test]
    fn replay_tool_calls() {
        let reply = BackendReply {
            content: Some(String::new()),
            tool_calls: vec![
                ToolCall::function("call_a", "a", "{}"),
                ToolCall::function("call_b", "b", "{}"),
            ],
            ..BackendReply::default()
        };

        let frames = ChatStreamTranslator::new("m", &cap(false)).replay(reply);
        let ChatFrame::Chunk(chunk) = &frames[0] else {
            panic!("expected chunk");
        };
        let calls = chunk.choices[0].delta.tool_calls.as_ref().unwrap();

        assert_eq!(calls.iter().map(|c| c.index).collect::<Vec<_>>(), vec![0, 1]);
        assert!(chunk.choices[0].delta.content.is_none());
        assert_eq!(chunk.choices[0].finish_reason.as_deref(), Some("tool_calls"));
    }

    #[test]
    fn replay_empty_reply_gets_placeholder() {
        let frames = ChatStreamTranslator::new("m", &cap(false)).replay(BackendReply::default());
        let ChatFrame::Chunk(chunk) = &frames[0] else {
            panic!("expected chunk");
        };

        assert_eq!(chunk.choices[0].delta.content.as_deref(), Some(" "));
    }

    /// Flags when the backend stream holding it is dropped
    struct ClosedFlag(Arc<AtomicBool>);

    impl Drop for ClosedFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn dropping_the_output_drops_the_backend_stream() {
        let closed = Arc::new(AtomicBool::new(false));
        let flag = ClosedFlag(Arc::clone(&closed));
        let backend: EventStream = Box::pin(
            futures_util::stream::iter(vec![Ok(StreamEvent::Delta(StreamDelta::content("Hel")))])
                .chain(futures_util::stream::pending())
                .map(move |event| {
                    let _held = &flag;
                    event
                }),
        );

        let mut frames = Box::pin(translate(backend, ChatStreamTranslator::new("llama", &cap(false))));
        assert!(matches!(frames.next().await, Some(ChatFrame::Chunk(_))));
        assert!(!closed.load(Ordering::SeqCst));

        drop(frames);
        assert!(closed.load(Ordering::SeqCst));
    }
}
