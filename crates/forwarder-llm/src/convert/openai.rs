//! Conversion between internal types and `OpenAI` wire format

use crate::protocol::openai::{
    OpenAiChoice, OpenAiChoiceMessage, OpenAiCompletionTokensDetails, OpenAiPromptTokensDetails, OpenAiRequest,
    OpenAiResponse, OpenAiStreamChunk, OpenAiStreamChoice, OpenAiStreamOptions, OpenAiUsage,
};
use crate::types::{
    BackendReply, Choice, CompletionParams, CompletionRequest, CompletionResponse, FinishReason, StreamDelta,
    StreamEvent, StreamFunctionCall, StreamToolCall, Usage,
};

// -- Inbound: OpenAI wire format -> internal types --

impl From<OpenAiRequest> for CompletionRequest {
    fn from(req: OpenAiRequest) -> Self {
        Self {
            model: req.model,
            messages: req.messages,
            params: CompletionParams {
                temperature: req.temperature,
                top_p: req.top_p,
                max_tokens: req.max_tokens.or(req.max_completion_tokens),
                stop: req.stop.map(Into::into),
                frequency_penalty: req.frequency_penalty,
                presence_penalty: req.presence_penalty,
                seed: req.seed,
            },
            tools: req.tools,
            tool_choice: req.tool_choice,
            reasoning_effort: req.reasoning_effort,
            stream: req.stream.unwrap_or(false),
        }
    }
}

// -- Outbound: internal request -> OpenAI wire request (for sending to a backend) --

impl From<&CompletionRequest> for OpenAiRequest {
    fn from(req: &CompletionRequest) -> Self {
        Self {
            model: req.model.clone(),
            messages: req.messages.clone(),
            temperature: req.params.temperature,
            top_p: req.params.top_p,
            max_tokens: req.params.max_tokens,
            max_completion_tokens: None,
            stop: req.params.stop.clone().map(crate::protocol::openai::OpenAiStop::Many),
            frequency_penalty: req.params.frequency_penalty,
            presence_penalty: req.params.presence_penalty,
            seed: req.params.seed,
            stream: req.stream.then_some(true),
            tools: req.tools.clone(),
            tool_choice: req.tool_choice.clone(),
            reasoning_effort: req.reasoning_effort.clone(),
            stream_options: req.stream.then_some(OpenAiStreamOptions { include_usage: true }),
        }
    }
}

// -- Backend reply -> canonical reply --

impl From<OpenAiResponse> for BackendReply {
    fn from(resp: OpenAiResponse) -> Self {
        let model = Some(resp.model).filter(|m| !m.is_empty());
        let usage = resp.usage.map(Usage::from);

        let Some(choice) = resp.choices.into_iter().next() else {
            return Self {
                model,
                usage,
                ..Self::default()
            };
        };

        Self {
            model,
            content: choice.message.content,
            reasoning: choice.message.reasoning_content,
            tool_calls: choice.message.tool_calls.unwrap_or_default(),
            finish: choice.finish_reason.as_deref().and_then(FinishReason::parse),
            usage,
        }
    }
}

impl From<OpenAiUsage> for Usage {
    fn from(usage: OpenAiUsage) -> Self {
        Self {
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
            cached_tokens: usage.prompt_tokens_details.map_or(0, |d| d.cached_tokens),
            reasoning_tokens: usage.completion_tokens_details.map_or(0, |d| d.reasoning_tokens),
        }
        .with_total()
    }
}

// -- Outbound: internal envelope -> OpenAI wire format --

impl From<CompletionResponse> for OpenAiResponse {
    fn from(resp: CompletionResponse) -> Self {
        Self {
            id: resp.id,
            object: resp.object,
            created: resp.created,
            model: resp.model,
            choices: resp.choices.into_iter().map(Into::into).collect(),
            usage: resp.usage.map(Into::into),
        }
    }
}

impl From<Choice> for OpenAiChoice {
    fn from(choice: Choice) -> Self {
        Self {
            index: choice.index,
            message: OpenAiChoiceMessage {
                role: choice.message.role,
                content: choice.message.content,
                reasoning_content: choice.message.reasoning_content,
                tool_calls: choice.message.tool_calls,
            },
            finish_reason: choice.finish_reason.map(|fr| finish_reason_str(fr).to_owned()),
        }
    }
}

impl From<Usage> for OpenAiUsage {
    fn from(usage: Usage) -> Self {
        Self {
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
            prompt_tokens_details: Some(OpenAiPromptTokensDetails {
                cached_tokens: usage.cached_tokens,
            }),
            completion_tokens_details: Some(OpenAiCompletionTokensDetails {
                reasoning_tokens: usage.reasoning_tokens,
            }),
        }
    }
}

/// Wire spelling of a finish reason
pub const fn finish_reason_str(reason: FinishReason) -> &'static str {
    match reason {
        FinishReason::Stop => "stop",
        FinishReason::Length => "length",
        FinishReason::ToolCalls => "tool_calls",
        FinishReason::ContentFilter => "content_filter",
    }
}

// -- Stream conversion --

/// Convert an `OpenAI` stream chunk into internal stream events
pub fn openai_chunk_to_events(chunk: &OpenAiStreamChunk) -> Vec<StreamEvent> {
    let mut events: Vec<StreamEvent> = chunk.choices.iter().flat_map(openai_stream_choice_to_deltas).collect();

    if let Some(usage) = &chunk.usage {
        events.push(StreamEvent::Usage(usage.clone().into()));
    }

    events
}

/// Convert one stream choice into deltas, one per tool call fragment
pub(crate) fn openai_stream_choice_to_deltas(choice: &OpenAiStreamChoice) -> Vec<StreamEvent> {
    let finish_reason = choice.finish_reason.as_deref().and_then(FinishReason::parse);

    let mut tool_calls = choice
        .delta
        .tool_calls
        .iter()
        .flatten()
        .map(|tc| StreamToolCall {
            index: tc.index,
            id: tc.id.clone(),
            function: tc.function.as_ref().map(|f| StreamFunctionCall {
                name: f.name.clone(),
                arguments: f.arguments.clone(),
            }),
        });

    let first = StreamDelta {
        content: choice.delta.content.clone(),
        reasoning: choice.delta.reasoning_content.clone(),
        tool_call: tool_calls.next(),
        finish_reason,
    };

    std::iter::once(first)
        .chain(tool_calls.map(|tc| StreamDelta {
            tool_call: Some(tc),
            ..StreamDelta::default()
        }))
        .map(StreamEvent::Delta)
        .collect()
}
