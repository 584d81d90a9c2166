//! Responses API adapter
//!
//! Builds `response` objects and typed `response.*` stream events from the
//! same canonical backend reply and event stream the chat path uses.

use forwarder_core::HttpError;
use forwarder_registry::ModelCapability;
use uuid::Uuid;

use crate::error::LlmError;
use crate::normalize::{EMPTY_CONTENT_FALLBACK, unix_now};
use crate::protocol::responses::{
    InputTokensDetails, OutputTokensDetails, ResponseError, ResponseObject, ResponseOutputContent,
    ResponseOutputItem, ResponseUsage, ResponsesStreamEvent,
};
use crate::stream::Translator;
use crate::types::{BackendReply, StreamDelta, StreamEvent, ToolCall, Usage};

const IN_PROGRESS: &str = "in_progress";
const COMPLETED: &str = "completed";
const FAILED: &str = "failed";

/// `resp_`-prefixed response identifier
pub fn response_id() -> String {
    format!("resp_{}", Uuid::new_v4().simple())
}

fn message_id() -> String {
    format!("msg_{}", Uuid::new_v4().simple())
}

fn function_call_id() -> String {
    format!("fc_{}", Uuid::new_v4().simple())
}

/// Build a completed response object from a backend reply
///
/// `output[0]` is always the assistant message; tool calls follow it as
/// `function_call` items.
pub fn to_response_object(reply: BackendReply, cap: &ModelCapability, model: &str) -> ResponseObject {
    let text = reply.content.filter(|c| !c.is_empty()).unwrap_or_else(|| {
        tracing::debug!(model = %model, "degenerate reply repaired with placeholder content");
        EMPTY_CONTENT_FALLBACK.to_owned()
    });

    let mut output = vec![message_item(message_id(), COMPLETED, Some(text))];
    output.extend(reply.tool_calls.into_iter().map(function_call_item));

    ResponseObject {
        id: response_id(),
        object: "response".to_owned(),
        created_at: unix_now(),
        status: COMPLETED.to_owned(),
        model: model.to_owned(),
        output,
        usage: response_usage(reply.usage, cap),
        error: None,
    }
}

fn message_item(id: String, status: &str, text: Option<String>) -> ResponseOutputItem {
    ResponseOutputItem::Message {
        id,
        status: status.to_owned(),
        role: "assistant".to_owned(),
        content: text.map(output_text).into_iter().collect(),
    }
}

fn output_text(text: String) -> ResponseOutputContent {
    ResponseOutputContent::OutputText {
        text,
        annotations: Vec::new(),
    }
}

fn function_call_item(call: ToolCall) -> ResponseOutputItem {
    ResponseOutputItem::FunctionCall {
        id: function_call_id(),
        call_id: call.id,
        name: call.function.name,
        arguments: call.function.arguments,
        status: COMPLETED.to_owned(),
    }
}

/// Nested Responses usage, zero-filled where the backend reported nothing
fn response_usage(usage: Option<Usage>, cap: &ModelCapability) -> ResponseUsage {
    let usage = usage.unwrap_or_default().with_total();

    ResponseUsage {
        input_tokens: usage.prompt_tokens,
        input_tokens_details: InputTokensDetails {
            cached_tokens: usage.cached_tokens,
        },
        output_tokens: usage.completion_tokens,
        output_tokens_details: OutputTokensDetails {
            reasoning_tokens: if cap.reasoning { usage.reasoning_tokens } else { 0 },
        },
        total_tokens: usage.total_tokens,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Created,
    Streaming,
    Closed,
}

/// Function call assembled from stream fragments
#[derive(Debug, Default)]
struct PendingCall {
    index: u32,
    call_id: String,
    name: String,
    arguments: String,
}

/// Translator producing typed Responses stream events
///
/// Event order for one response:
///
/// ```text
/// response.created
/// response.output_item.added      (message, output_index 0)
/// response.content_part.added     (empty output_text, content_index 0)
/// response.output_text.delta *    (one per text fragment)
/// response.output_text.done       (assembled text)
/// response.content_part.done      (output_text with the assembled text)
/// response.output_item.done       (message with the assembled text)
/// [response.output_item.added, response.output_item.done] per function call
/// response.completed | response.failed
/// ```
#[derive(Debug)]
pub struct ResponsesStreamTranslator {
    response_id: String,
    message_id: String,
    model: String,
    created_at: u64,
    reasoning: bool,
    state: State,
    sequence: u64,
    text: String,
    calls: Vec<PendingCall>,
    usage: Option<Usage>,
}

impl ResponsesStreamTranslator {
    /// Translator for `model` (client-facing id) with the given capability
    pub fn new(model: impl Into<String>, cap: &ModelCapability) -> Self {
        Self {
            response_id: response_id(),
            message_id: message_id(),
            model: model.into(),
            created_at: unix_now(),
            reasoning: cap.reasoning,
            state: State::Created,
            sequence: 0,
            text: String::new(),
            calls: Vec::new(),
            usage: None,
        }
    }

    /// Replay a complete backend reply as a full event sequence
    pub fn replay(mut self, reply: BackendReply) -> Vec<ResponsesStreamEvent> {
        let mut events = self.open();
        if let Some(content) = reply.content.filter(|c| !c.is_empty()) {
            events.extend(self.text_delta(content));
        }

        for (call, index) in reply.tool_calls.into_iter().zip(0u32..) {
            self.calls.push(PendingCall {
                index,
                call_id: call.id,
                name: call.function.name,
                arguments: call.function.arguments,
            });
        }
        self.usage = reply.usage;

        events.extend(self.finish());
        events
    }

    fn next_sequence(&mut self) -> u64 {
        let current = self.sequence;
        self.sequence += 1;
        current
    }

    fn snapshot(&self, status: &str, output: Vec<ResponseOutputItem>) -> ResponseObject {
        let cap = ModelCapability {
            reasoning: self.reasoning,
            ..ModelCapability::conservative(&self.model)
        };

        ResponseObject {
            id: self.response_id.clone(),
            object: "response".to_owned(),
            created_at: self.created_at,
            status: status.to_owned(),
            model: self.model.clone(),
            output,
            usage: response_usage(self.usage, &cap),
            error: None,
        }
    }

    /// `response.created` and the opening of the message item
    fn open(&mut self) -> Vec<ResponsesStreamEvent> {
        if self.state != State::Created {
            return Vec::new();
        }
        self.state = State::Streaming;

        let created = ResponsesStreamEvent::Created {
            sequence_number: self.next_sequence(),
            response: self.snapshot(IN_PROGRESS, Vec::new()),
        };
        let added = ResponsesStreamEvent::OutputItemAdded {
            sequence_number: self.next_sequence(),
            output_index: 0,
            item: message_item(self.message_id.clone(), IN_PROGRESS, None),
        };
        let part_added = ResponsesStreamEvent::ContentPartAdded {
            sequence_number: self.next_sequence(),
            item_id: self.message_id.clone(),
            output_index: 0,
            content_index: 0,
            part: output_text(String::new()),
        };

        vec![created, added, part_added]
    }

    fn text_delta(&mut self, delta: String) -> Option<ResponsesStreamEvent> {
        if delta.is_empty() {
            return None;
        }
        self.text.push_str(&delta);

        Some(ResponsesStreamEvent::OutputTextDelta {
            sequence_number: self.next_sequence(),
            item_id: self.message_id.clone(),
            output_index: 0,
            content_index: 0,
            delta,
        })
    }

    fn on_delta(&mut self, delta: StreamDelta) -> Vec<ResponsesStreamEvent> {
        let mut events = self.open();

        if let Some(call) = delta.tool_call {
            let position = match self.calls.iter().position(|c| c.index == call.index) {
                Some(position) => position,
                None => {
                    self.calls.push(PendingCall {
                        index: call.index,
                        ..PendingCall::default()
                    });
                    self.calls.len() - 1
                }
            };
            let pending = &mut self.calls[position];

            if let Some(id) = call.id {
                pending.call_id = id;
            }
            if let Some(function) = call.function {
                if let Some(name) = function.name {
                    pending.name.push_str(&name);
                }
                if let Some(arguments) = function.arguments {
                    pending.arguments.push_str(&arguments);
                }
            }
        }

        if let Some(content) = delta.content {
            events.extend(self.text_delta(content));
        }

        events
    }

    /// Close the message item and emit function call items
    fn close_items(&mut self) -> (Vec<ResponsesStreamEvent>, Vec<ResponseOutputItem>) {
        let mut events = self.open();

        if self.text.is_empty() {
            tracing::debug!(model = %self.model, "stream produced no text, emitting placeholder");
            events.extend(self.text_delta(EMPTY_CONTENT_FALLBACK.to_owned()));
        }

        events.push(ResponsesStreamEvent::OutputTextDone {
            sequence_number: self.next_sequence(),
            item_id: self.message_id.clone(),
            output_index: 0,
            content_index: 0,
            text: self.text.clone(),
        });
        events.push(ResponsesStreamEvent::ContentPartDone {
            sequence_number: self.next_sequence(),
            item_id: self.message_id.clone(),
            output_index: 0,
            content_index: 0,
            part: output_text(self.text.clone()),
        });

        let message = message_item(self.message_id.clone(), COMPLETED, Some(self.text.clone()));
        events.push(ResponsesStreamEvent::OutputItemDone {
            sequence_number: self.next_sequence(),
            output_index: 0,
            item: message.clone(),
        });

        let mut output = vec![message];
        for (pending, output_index) in std::mem::take(&mut self.calls).into_iter().zip(1u32..) {
            let call_id = if pending.call_id.is_empty() {
                crate::convert::generate_call_id()
            } else {
                pending.call_id
            };
            let id = function_call_id();

            events.push(ResponsesStreamEvent::OutputItemAdded {
                sequence_number: self.next_sequence(),
                output_index,
                item: ResponseOutputItem::FunctionCall {
                    id: id.clone(),
                    call_id: call_id.clone(),
                    name: pending.name.clone(),
                    arguments: String::new(),
                    status: IN_PROGRESS.to_owned(),
                },
            });

            let item = ResponseOutputItem::FunctionCall {
                id,
                call_id,
                name: pending.name,
                arguments: pending.arguments,
                status: COMPLETED.to_owned(),
            };
            events.push(ResponsesStreamEvent::OutputItemDone {
                sequence_number: self.next_sequence(),
                output_index,
                item: item.clone(),
            });
            output.push(item);
        }

        (events, output)
    }
}

impl Translator for ResponsesStreamTranslator {
    type Frame = ResponsesStreamEvent;

    fn on_event(&mut self, event: StreamEvent) -> Vec<ResponsesStreamEvent> {
        if self.state == State::Closed {
            return Vec::new();
        }

        match event {
            StreamEvent::Delta(delta) => self.on_delta(delta),
            StreamEvent::Usage(usage) => {
                self.usage = Some(usage);
                self.open()
            }
            StreamEvent::Done => self.finish(),
        }
    }

    fn on_error(&mut self, error: &LlmError) -> Vec<ResponsesStreamEvent> {
        if self.state == State::Closed {
            return Vec::new();
        }

        tracing::warn!(model = %self.model, error = %error, "backend stream failed");

        let mut events = self.open();
        events.push(ResponsesStreamEvent::Error {
            sequence_number: self.next_sequence(),
            code: error.error_type().to_owned(),
            message: error.client_message(),
        });

        let (closing, output) = self.close_items();
        events.extend(closing);

        let mut response = self.snapshot(FAILED, output);
        response.error = Some(ResponseError {
            code: error.error_type().to_owned(),
            message: error.client_message(),
        });
        events.push(ResponsesStreamEvent::Failed {
            sequence_number: self.next_sequence(),
            response,
        });

        self.state = State::Closed;
        events
    }

    fn finish(&mut self) -> Vec<ResponsesStreamEvent> {
        if self.state == State::Closed {
            return Vec::new();
        }

        let (mut events, output) = self.close_items();
        events.push(ResponsesStreamEvent::Completed {
            sequence_number: self.next_sequence(),
            response: self.snapshot(COMPLETED, output),
        });

        self.state = State::Closed;
        events
    }

    fn is_closed(&self) -> bool {
        self.state == State::Closed
    }
}

impl Drop for ResponsesStreamTranslator {
    fn drop(&mut self) {
        if self.state != State::Closed {
            tracing::debug!(model = %self.model, "client disconnected before response completed");
        }
    }
}
