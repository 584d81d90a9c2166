//! Cloudflare Workers AI `ai/run` wire format types

use serde::{Deserialize, Serialize};

use super::openai::{OpenAiChoice, OpenAiStreamChoice};
use crate::types::{Message, ToolDefinition};

// -- Request types --

/// Body for `POST /accounts/{account_id}/ai/run/{model}`
#[derive(Debug, Clone, Serialize)]
pub struct WorkersAiRequest {
    /// Conversation messages
    pub messages: Vec<Message>,
    /// Tool definitions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDefinition>>,
    /// Whether to stream the response
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Sampling temperature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Nucleus sampling threshold
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    /// Random seed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Frequency penalty
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>,
    /// Presence penalty
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,
    /// Reasoning settings for reasoning models
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<WorkersAiReasoning>,
}

/// Reasoning settings
#[derive(Debug, Clone, Serialize)]
pub struct WorkersAiReasoning {
    /// Effort level ("low", "medium", "high")
    pub effort: String,
}

// -- Response types --

/// Cloudflare API envelope
#[derive(Debug, Clone, Deserialize)]
pub struct WorkersAiEnvelope<T> {
    /// Whether the call succeeded; absent on some endpoints
    #[serde(default)]
    pub success: Option<bool>,
    /// Payload
    pub result: Option<T>,
    /// Error list when `success` is false
    #[serde(default)]
    pub errors: Vec<WorkersAiApiError>,
}

/// Single error entry in a Cloudflare envelope
#[derive(Debug, Clone, Deserialize)]
pub struct WorkersAiApiError {
    /// Numeric error code
    #[serde(default)]
    pub code: Option<i64>,
    /// Error message
    #[serde(default)]
    pub message: String,
}

/// `result` payload of a text generation call
///
/// Models answer in one of three shapes depending on their family.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WorkersAiResult {
    /// Chat-completions shape (`choices`)
    Chat(WorkersAiChatResult),
    /// Responses shape used by reasoning models (`output`)
    Responses(WorkersAiResponsesResult),
    /// Classic text shape (`response`)
    Text(WorkersAiTextResult),
}

/// Chat-completions shaped result
#[derive(Debug, Clone, Deserialize)]
pub struct WorkersAiChatResult {
    /// Model reported by the backend
    #[serde(default)]
    pub model: Option<String>,
    /// Generated choices
    pub choices: Vec<OpenAiChoice>,
    /// Token usage
    #[serde(default)]
    pub usage: Option<WorkersAiUsage>,
}

/// Responses shaped result
#[derive(Debug, Clone, Deserialize)]
pub struct WorkersAiResponsesResult {
    /// Model reported by the backend
    #[serde(default)]
    pub model: Option<String>,
    /// Output items in generation order
    pub output: Vec<WorkersAiOutputItem>,
    /// Token usage
    #[serde(default)]
    pub usage: Option<WorkersAiUsage>,
}

/// Item in a responses shaped result
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkersAiOutputItem {
    /// Reasoning trace
    Reasoning {
        /// Reasoning text parts
        #[serde(default)]
        content: Vec<WorkersAiTextPart>,
        /// Reasoning summary parts
        #[serde(default)]
        summary: Vec<WorkersAiTextPart>,
    },
    /// Assistant message
    Message {
        /// Output text parts
        #[serde(default)]
        content: Vec<WorkersAiTextPart>,
    },
    /// Function call
    FunctionCall {
        /// Call identifier
        #[serde(default)]
        call_id: Option<String>,
        /// Function name
        name: String,
        /// JSON-encoded arguments
        #[serde(default)]
        arguments: String,
    },
    /// Any item type not handled here
    #[serde(other)]
    Other,
}

/// Text part inside an output item
#[derive(Debug, Clone, Deserialize)]
pub struct WorkersAiTextPart {
    /// Text
    #[serde(default)]
    pub text: String,
}

/// Classic text result
#[derive(Debug, Clone, Deserialize)]
pub struct WorkersAiTextResult {
    /// Generated text; some models return structured JSON here
    #[serde(default)]
    pub response: Option<serde_json::Value>,
    /// Tool calls requested by the model
    #[serde(default)]
    pub tool_calls: Vec<WorkersAiToolCall>,
    /// Token usage
    #[serde(default)]
    pub usage: Option<WorkersAiUsage>,
}

/// Tool call in either the flat (`name`, `arguments`) or nested (`function`) form
#[derive(Debug, Clone, Deserialize)]
pub struct WorkersAiToolCall {
    /// Call identifier
    #[serde(default)]
    pub id: Option<String>,
    /// Function name (flat form)
    #[serde(default)]
    pub name: Option<String>,
    /// Arguments as an object or encoded string (flat form)
    #[serde(default)]
    pub arguments: Option<serde_json::Value>,
    /// Nested function (OpenAI-like form)
    #[serde(default)]
    pub function: Option<WorkersAiFunction>,
}

/// Nested function in a tool call
#[derive(Debug, Clone, Deserialize)]
pub struct WorkersAiFunction {
    /// Function name
    pub name: String,
    /// Arguments as an object or encoded string
    #[serde(default)]
    pub arguments: Option<serde_json::Value>,
}

/// Token usage; accepts both chat and responses field names
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct WorkersAiUsage {
    /// Prompt tokens
    #[serde(default, alias = "input_tokens")]
    pub prompt_tokens: u32,
    /// Completion tokens
    #[serde(default, alias = "output_tokens")]
    pub completion_tokens: u32,
    /// Total tokens
    #[serde(default)]
    pub total_tokens: u32,
}

// -- Streaming types --

/// Data payload of one Workers AI SSE event
#[derive(Debug, Clone, Deserialize)]
pub struct WorkersAiStreamChunk {
    /// Token fragment
    #[serde(default)]
    pub response: Option<String>,
    /// Tool calls (emitted whole, usually at the end)
    #[serde(default)]
    pub tool_calls: Option<Vec<WorkersAiToolCall>>,
    /// Chat-completions shaped deltas from newer models
    #[serde(default)]
    pub choices: Option<Vec<OpenAiStreamChoice>>,
    /// Usage (final event)
    #[serde(default)]
    pub usage: Option<WorkersAiUsage>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_with_text_result() {
        let envelope: WorkersAiEnvelope<WorkersAiResult> = serde_json::from_value(serde_json::json!({
            "success": true,
            "result": {"response": "hello", "usage": {"prompt_tokens": 3, "completion_tokens": 1, "total_tokens": 4}},
            "errors": []
        }))
        .unwrap();

        assert_eq!(envelope.success, Some(true));
        let Some(WorkersAiResult::Text(text)) = envelope.result else {
            panic!("expected text result");
        };
        assert_eq!(text.response, Some(serde_json::json!("hello")));
        assert_eq!(text.usage.map(|u| u.total_tokens), Some(4));
    }

    #[test]
    fn envelope_without_result_reports_errors() {
        let envelope: WorkersAiEnvelope<WorkersAiResult> = serde_json::from_value(serde_json::json!({
            "success": false,
            "errors": [{"code": 5006, "message": "model not found"}]
        }))
        .unwrap();

        assert_eq!(envelope.success, Some(false));
        assert!(envelope.result.is_none());
        assert_eq!(envelope.errors[0].code, Some(5006));
        assert_eq!(envelope.errors[0].message, "model not found");
    }
}
