//! Conversion between internal types and Workers AI wire format

use crate::protocol::workers_ai::{
    WorkersAiOutputItem, WorkersAiReasoning, WorkersAiRequest, WorkersAiResult, WorkersAiStreamChunk,
    WorkersAiTextPart, WorkersAiToolCall, WorkersAiUsage,
};
use crate::types::{
    BackendReply, CompletionRequest, FinishReason, StreamDelta, StreamEvent, StreamFunctionCall, StreamToolCall,
    ToolCall, Usage,
};

impl From<&CompletionRequest> for WorkersAiRequest {
    fn from(req: &CompletionRequest) -> Self {
        Self {
            messages: req.messages.clone(),
            tools: req.tools.clone(),
            stream: req.stream.then_some(true),
            max_tokens: req.params.max_tokens,
            temperature: req.params.temperature,
            top_p: req.params.top_p,
            seed: req.params.seed,
            frequency_penalty: req.params.frequency_penalty,
            presence_penalty: req.params.presence_penalty,
            reasoning: req
                .reasoning_effort
                .clone()
                .map(|effort| WorkersAiReasoning { effort }),
        }
    }
}

impl From<WorkersAiUsage> for Usage {
    fn from(usage: WorkersAiUsage) -> Self {
        Self {
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
            ..Self::default()
        }
        .with_total()
    }
}

impl From<WorkersAiResult> for BackendReply {
    fn from(result: WorkersAiResult) -> Self {
        match result {
            WorkersAiResult::Chat(chat) => {
                let usage = chat.usage.map(Usage::from);
                let mut reply = Self::from(crate::protocol::openai::OpenAiResponse {
                    id: String::new(),
                    object: String::new(),
                    created: 0,
                    model: chat.model.unwrap_or_default(),
                    choices: chat.choices,
                    usage: None,
                });
                reply.usage = usage;
                reply
            }
            WorkersAiResult::Responses(responses) => {
                let mut content: Option<String> = None;
                let mut reasoning: Option<String> = None;
                let mut tool_calls = Vec::new();

                for item in responses.output {
                    match item {
                        WorkersAiOutputItem::Message { content: parts } => append_parts(&mut content, &parts),
                        WorkersAiOutputItem::Reasoning { content: parts, summary } => {
                            let parts = if parts.is_empty() { summary } else { parts };
                            append_parts(&mut reasoning, &parts);
                        }
                        WorkersAiOutputItem::FunctionCall { call_id, name, arguments } => {
                            let id = call_id.unwrap_or_else(super::generate_call_id);
                            tool_calls.push(ToolCall::function(id, name, arguments));
                        }
                        WorkersAiOutputItem::Other => {}
                    }
                }

                Self {
                    model: responses.model,
                    content,
                    reasoning,
                    finish: Some(if tool_calls.is_empty() {
                        FinishReason::Stop
                    } else {
                        FinishReason::ToolCalls
                    }),
                    tool_calls,
                    usage: responses.usage.map(Usage::from),
                }
            }
            WorkersAiResult::Text(text) => {
                let content = text.response.and_then(|value| match value {
                    serde_json::Value::Null => None,
                    serde_json::Value::String(s) => Some(s),
                    other => Some(other.to_string()),
                });

                let tool_calls: Vec<ToolCall> = text.tool_calls.into_iter().filter_map(tool_call_from_wire).collect();

                Self {
                    model: None,
                    content,
                    reasoning: None,
                    finish: Some(if tool_calls.is_empty() {
                        FinishReason::Stop
                    } else {
                        FinishReason::ToolCalls
                    }),
                    tool_calls,
                    usage: text.usage.map(Usage::from),
                }
            }
        }
    }
}

fn append_parts(target: &mut Option<String>, parts: &[WorkersAiTextPart]) {
    for part in parts {
        target.get_or_insert_with(String::new).push_str(&part.text);
    }
}

/// Convert either tool call form; calls without a name are dropped
fn tool_call_from_wire(call: WorkersAiToolCall) -> Option<ToolCall> {
    let (name, arguments) = match call.function {
        Some(function) => (function.name, function.arguments),
        None => (call.name?, call.arguments),
    };

    let arguments = match arguments {
        None | Some(serde_json::Value::Null) => "{}".to_owned(),
        Some(serde_json::Value::String(s)) => s,
        Some(other) => other.to_string(),
    };

    let id = call.id.unwrap_or_else(super::generate_call_id);

    Some(ToolCall::function(id, name, arguments))
}

/// Convert one Workers AI stream payload into internal stream events
///
/// Whole tool calls are numbered from `next_tool_index`, which carries the
/// count across the chunks of one stream.
pub fn workers_ai_chunk_to_events(chunk: WorkersAiStreamChunk, next_tool_index: &mut u32) -> Vec<StreamEvent> {
    let mut events = Vec::new();

    if let Some(text) = chunk.response.filter(|t| !t.is_empty()) {
        events.push(StreamEvent::Delta(StreamDelta::content(text)));
    }

    for choice in chunk.choices.iter().flatten() {
        events.extend(super::openai::openai_stream_choice_to_deltas(choice));
    }

    for call in chunk.tool_calls.into_iter().flatten().filter_map(tool_call_from_wire) {
        let index = *next_tool_index;
        *next_tool_index += 1;

        events.push(StreamEvent::Delta(StreamDelta {
            tool_call: Some(StreamToolCall {
                index,
                id: Some(call.id),
                function: Some(StreamFunctionCall {
                    name: Some(call.function.name),
                    arguments: Some(call.function.arguments),
                }),
            }),
            ..StreamDelta::default()
        }));
    }

    if let Some(usage) = chunk.usage {
        events.push(StreamEvent::Usage(usage.into()));
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::workers_ai::WorkersAiEnvelope;

    fn parse(value: serde_json::Value) -> BackendReply {
        let envelope: WorkersAiEnvelope<WorkersAiResult> = serde_json::from_value(value).unwrap();
        envelope.result.unwrap().into()
    }

    #[test]
    fn text_result() {
        let reply = parse(serde_json::json!({
            "success": true,
            "errors": [],
            "result": {"response": "Hello!", "usage": {"prompt_tokens": 5, "completion_tokens": 2, "total_tokens": 7}}
        }));

        assert_eq!(reply.content.as_deref(), Some("Hello!"));
        assert_eq!(reply.finish, Some(FinishReason::Stop));
        assert_eq!(reply.usage.map(|u| u.total_tokens), Some(7));
    }

    #[test]
    fn text_result_with_flat_tool_calls() {
        let reply = parse(serde_json::json!({
            "result": {"response": null, "tool_calls": [{"name": "get_weather", "arguments": {"city": "Paris"}}]}
        }));

        assert_eq!(reply.content, None);
        assert_eq!(reply.tool_calls.len(), 1);
        assert_eq!(reply.tool_calls[0].function.name, "get_weather");
        assert_eq!(reply.tool_calls[0].function.arguments, r#"{"city":"Paris"}"#);
        assert!(reply.tool_calls[0].id.starts_with("call_"));
        assert_eq!(reply.finish, Some(FinishReason::ToolCalls));
    }

    #[test]
    fn responses_result_separates_reasoning() {
        let reply = parse(serde_json::json!({
            "result": {
                "output": [
                    {"type": "reasoning", "content": [{"type": "reasoning_text", "text": "User greets."}]},
                    {"type": "message", "role": "assistant", "content": [{"type": "output_text", "text": "Hello!"}]}
                ],
                "usage": {"input_tokens": 10, "output_tokens": 20}
            }
        }));

        assert_eq!(reply.content.as_deref(), Some("Hello!"));
        assert_eq!(reply.reasoning.as_deref(), Some("User greets."));
        assert_eq!(reply.usage.map(|u| u.total_tokens), Some(30));
    }

    #[test]
    fn responses_result_with_reasoning_only_is_degenerate() {
        let reply = parse(serde_json::json!({
            "result": {"output": [{"type": "reasoning", "content": [{"type": "reasoning_text", "text": "hmm"}]}]}
        }));

        assert!(reply.is_degenerate());
    }

    #[test]
    fn chat_result() {
        let reply = parse(serde_json::json!({
            "result": {
                "choices": [{"index": 0, "message": {"role": "assistant", "content": "Hi"}, "finish_reason": "stop"}],
                "usage": {"prompt_tokens": 1, "completion_tokens": 1, "total_tokens": 2}
            }
        }));

        assert_eq!(reply.content.as_deref(), Some("Hi"));
        assert_eq!(reply.usage.map(|u| u.total_tokens), Some(2));
    }

    #[test]
    fn stream_chunk_events() {
        let chunk: WorkersAiStreamChunk = serde_json::from_value(serde_json::json!({"response": "Hel"})).unwrap();
        assert_eq!(
            workers_ai_chunk_to_events(chunk, &mut 0),
            vec![StreamEvent::Delta(StreamDelta::content("Hel"))]
        );

        let last: WorkersAiStreamChunk =
            serde_json::from_value(serde_json::json!({"response": "", "usage": {"prompt_tokens": 2, "completion_tokens": 3}}))
                .unwrap();
        let events = workers_ai_chunk_to_events(last, &mut 0);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], StreamEvent::Usage(u) if u.total_tokens == 5));
    }

    #[test]
    fn tool_calls_in_separate_chunks_get_distinct_indices() {
        let first: WorkersAiStreamChunk = serde_json::from_value(serde_json::json!({
            "tool_calls": [{"id": "call_a", "name": "search", "arguments": {"q": "a"}}]
        }))
        .unwrap();
        let second: WorkersAiStreamChunk = serde_json::from_value(serde_json::json!({
            "tool_calls": [{"id": "call_b", "name": "lookup", "arguments": {"id": 1}}]
        }))
        .unwrap();

        let mut next = 0;
        let mut events = workers_ai_chunk_to_events(first, &mut next);
        events.extend(workers_ai_chunk_to_events(second, &mut next));

        let calls: Vec<(u32, Option<String>)> = events
            .into_iter()
            .filter_map(|e| match e {
                StreamEvent::Delta(StreamDelta {
                    tool_call: Some(call), ..
                }) => Some((call.index, call.id)),
                _ => None,
            })
            .collect();
        assert_eq!(
            calls,
            vec![(0, Some("call_a".to_owned())), (1, Some("call_b".to_owned()))]
        );
        assert_eq!(next, 2);
    }
}
