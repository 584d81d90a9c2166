//! Mapping Responses API requests onto the chat completion model

use crate::error::LlmError;
use crate::protocol::responses::{
    ResponsesContent, ResponsesContentPart, ResponsesInput, ResponsesInputItem, ResponsesRequest, ResponsesTool,
};
use crate::types::message::ImageUrl;
use crate::types::{
    CompletionParams, CompletionRequest, Content, ContentPart, FunctionDefinition, Message, Role, ToolCall, ToolChoice,
    ToolChoiceFunction, ToolChoiceFunctionName, ToolChoiceMode, ToolDefinition,
};

impl TryFrom<ResponsesRequest> for CompletionRequest {
    type Error = LlmError;

    fn try_from(req: ResponsesRequest) -> Result<Self, Self::Error> {
        let mut messages = Vec::new();

        if let Some(instructions) = req.instructions.filter(|i| !i.trim().is_empty()) {
            messages.push(Message::text(Role::System, instructions));
        }

        match req.input {
            ResponsesInput::Text(text) => {
                if text.trim().is_empty() {
                    return Err(LlmError::InvalidRequest("input must not be empty".to_owned()));
                }
                messages.push(Message::text(Role::User, text));
            }
            ResponsesInput::Items(items) => {
                if items.is_empty() {
                    return Err(LlmError::InvalidRequest("input must not be empty".to_owned()));
                }
                for item in items {
                    push_item(&mut messages, item)?;
                }
            }
        }

        let tools: Vec<ToolDefinition> = req.tools.into_iter().flatten().filter_map(tool_from_wire).collect();

        Ok(Self {
            model: req.model,
            messages,
            params: CompletionParams {
                temperature: req.temperature,
                top_p: req.top_p,
                max_tokens: req.max_output_tokens,
                ..CompletionParams::default()
            },
            tool_choice: if tools.is_empty() {
                None
            } else {
                req.tool_choice.as_ref().and_then(tool_choice_from_wire)
            },
            tools: (!tools.is_empty()).then_some(tools),
            reasoning_effort: req.reasoning.and_then(|r| r.effort),
            stream: req.stream.unwrap_or(false),
        })
    }
}

fn push_item(messages: &mut Vec<Message>, item: ResponsesInputItem) -> Result<(), LlmError> {
    match item {
        ResponsesInputItem::Message { role, content } => {
            let role = match role.as_str() {
                "system" => Role::System,
                "developer" => Role::Developer,
                "user" => Role::User,
                "assistant" => Role::Assistant,
                other => return Err(LlmError::InvalidRequest(format!("unsupported input role '{other}'"))),
            };
            messages.push(Message {
                role,
                content: Some(content_from_wire(content)),
                name: None,
                tool_calls: None,
                tool_call_id: None,
            });
        }
        ResponsesInputItem::FunctionCall { call_id, name, arguments } => {
            let call = ToolCall::function(call_id, name, arguments);

            // Consecutive calls from one assistant turn share a message
            if let Some(last) = messages.last_mut()
                && last.role == Role::Assistant
                && last.content.is_none()
                && let Some(calls) = last.tool_calls.as_mut()
            {
                calls.push(call);
            } else {
                messages.push(Message {
                    role: Role::Assistant,
                    content: None,
                    name: None,
                    tool_calls: Some(vec![call]),
                    tool_call_id: None,
                });
            }
        }
        ResponsesInputItem::FunctionCallOutput { call_id, output } => {
            messages.push(Message {
                role: Role::Tool,
                content: Some(Content::Text(output)),
                name: None,
                tool_calls: None,
                tool_call_id: Some(call_id),
            });
        }
    }

    Ok(())
}

fn content_from_wire(content: ResponsesContent) -> Content {
    match content {
        ResponsesContent::Text(text) => Content::Text(text),
        ResponsesContent::Parts(parts) => Content::Parts(parts.into_iter().filter_map(part_from_wire).collect()),
    }
}

fn part_from_wire(part: ResponsesContentPart) -> Option<ContentPart> {
    match part.part_type.as_str() {
        "input_text" | "output_text" | "text" => part.text.map(|text| ContentPart::Text { text }),
        "input_image" => part.image_url.map(|url| ContentPart::ImageUrl {
            image_url: ImageUrl { url, detail: None },
        }),
        other => {
            tracing::debug!(part_type = %other, "dropping unsupported input content part");
            None
        }
    }
}

fn tool_from_wire(tool: ResponsesTool) -> Option<ToolDefinition> {
    if tool.tool_type != "function" {
        tracing::debug!(tool_type = %tool.tool_type, "dropping non-function tool");
        return None;
    }

    Some(ToolDefinition {
        tool_type: tool.tool_type,
        function: FunctionDefinition {
            name: tool.name?,
            description: tool.description,
            parameters: tool.parameters,
            strict: tool.strict,
        },
    })
}

/// Accepts `"auto"`-style modes and `{"type": "function", "name": ...}`
fn tool_choice_from_wire(value: &serde_json::Value) -> Option<ToolChoice> {
    match value {
        serde_json::Value::String(mode) => match mode.as_str() {
            "none" => Some(ToolChoice::Mode(ToolChoiceMode::None)),
            "auto" => Some(ToolChoice::Mode(ToolChoiceMode::Auto)),
            "required" => Some(ToolChoice::Mode(ToolChoiceMode::Required)),
            _ => None,
        },
        serde_json::Value::Object(map) => {
            let name = map.get("name").and_then(serde_json::Value::as_str)?;
            Some(ToolChoice::Function(ToolChoiceFunction {
                tool_type: "function".to_owned(),
                function: ToolChoiceFunctionName { name: name.to_owned() },
            }))
        }
        _ => None,
    }
}
