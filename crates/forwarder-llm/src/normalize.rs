//! Chat completion envelope normalization
//!
//! Rewrites a backend reply into an envelope that strict `OpenAI` clients
//! accept: exactly one choice, role always `assistant`, a finish reason that
//! matches the content (`tool_calls` or `stop`), a non-empty content string
//! when there are no tool calls, and zero-filled usage.

use std::time::{SystemTime, UNIX_EPOCH};

use forwarder_registry::ModelCapability;
use uuid::Uuid;

use crate::types::{BackendReply, Choice, ChoiceMessage, CompletionResponse, FinishReason};

/// Content substituted for missing or empty assistant text
///
/// Several client libraries reject `null`/empty content outright.
pub const EMPTY_CONTENT_FALLBACK: &str = " ";

const ASSISTANT: &str = "assistant";

/// Build a conformant chat envelope from a backend reply
///
/// `model` is the client-facing model identifier, echoed back unchanged.
pub fn normalize(reply: BackendReply, cap: &ModelCapability, model: &str) -> CompletionResponse {
    let tool_calls = Some(reply.tool_calls).filter(|calls| !calls.is_empty());
    let reasoning_content = reply.reasoning.filter(|_| cap.reasoning);

    let response = CompletionResponse {
        id: completion_id(),
        object: "chat.completion".to_owned(),
        created: unix_now(),
        model: model.to_owned(),
        choices: vec![Choice {
            index: 0,
            message: ChoiceMessage {
                role: ASSISTANT.to_owned(),
                content: reply.content,
                reasoning_content,
                tool_calls,
            },
            finish_reason: reply.finish,
        }],
        usage: Some(reply.usage.unwrap_or_default()),
    };

    normalize_envelope(response)
}

/// Enforce envelope invariants on an already-built response
///
/// Idempotent: normalizing a normalized envelope is a no-op.
pub fn normalize_envelope(mut response: CompletionResponse) -> CompletionResponse {
    "chat.completion".clone_into(&mut response.object);

    if response.choices.is_empty() {
        response.choices.push(Choice {
            index: 0,
            message: ChoiceMessage {
                role: ASSISTANT.to_owned(),
                content: None,
                reasoning_content: None,
                tool_calls: None,
            },
            finish_reason: None,
        });
    }
    response.choices.truncate(1);

    for choice in &mut response.choices {
        normalize_choice(choice);
    }

    response.usage = Some(response.usage.unwrap_or_default().with_total());
    response
}

fn normalize_choice(choice: &mut Choice) {
    let message = &mut choice.message;
    choice.index = 0;
    ASSISTANT.clone_into(&mut message.role);

    if message.tool_calls.as_ref().is_some_and(Vec::is_empty) {
        message.tool_calls = None;
    }
    if message.reasoning_content.as_deref().is_some_and(str::is_empty) {
        message.reasoning_content = None;
    }

    if message.tool_calls.is_some() {
        message.content = None;
        choice.finish_reason = Some(FinishReason::ToolCalls);
        return;
    }

    if message.content.as_deref().is_none_or(str::is_empty) {
        tracing::debug!("degenerate reply repaired with placeholder content");
        message.content = Some(EMPTY_CONTENT_FALLBACK.to_owned());
    }
    choice.finish_reason = Some(FinishReason::Stop);
}

/// `chatcmpl-` identifier for a new envelope
pub(crate) fn completion_id() -> String {
    format!("chatcmpl-{}", Uuid::new_v4().simple())
}

/// Seconds since the Unix epoch
pub(crate) fn unix_now() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |d| d.as_secs())
}
