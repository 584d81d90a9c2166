//! `OpenAI` Responses API wire format types

use serde::{Deserialize, Serialize};

// -- Request types --

/// `POST /v1/responses` request body
#[derive(Debug, Clone, Deserialize)]
pub struct ResponsesRequest {
    /// Model identifier
    pub model: String,
    /// Conversation input
    pub input: ResponsesInput,
    /// System-level instructions
    #[serde(default)]
    pub instructions: Option<String>,
    /// Whether to stream typed events
    #[serde(default)]
    pub stream: Option<bool>,
    /// Tool definitions (flat Responses form)
    #[serde(default)]
    pub tools: Option<Vec<ResponsesTool>>,
    /// Tool choice configuration
    #[serde(default)]
    pub tool_choice: Option<serde_json::Value>,
    /// Sampling temperature
    #[serde(default)]
    pub temperature: Option<f64>,
    /// Nucleus sampling threshold
    #[serde(default)]
    pub top_p: Option<f64>,
    /// Maximum tokens to generate
    #[serde(default)]
    pub max_output_tokens: Option<u32>,
    /// Reasoning settings
    #[serde(default)]
    pub reasoning: Option<ResponsesReasoning>,
}

/// Input is either one user string or a list of items
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ResponsesInput {
    /// Single user message
    Text(String),
    /// Ordered conversation items
    Items(Vec<ResponsesInputItem>),
}

/// One conversation item
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ResponsesInputItem {
    /// Role-tagged message
    Message {
        /// Author role
        role: String,
        /// Text or content parts
        content: ResponsesContent,
    },
    /// Earlier function call by the assistant
    FunctionCall {
        /// Call identifier
        call_id: String,
        /// Function name
        name: String,
        /// JSON-encoded arguments
        arguments: String,
    },
    /// Result of an earlier function call
    FunctionCallOutput {
        /// Call identifier
        call_id: String,
        /// Tool output
        output: String,
    },
}

/// Message content in Responses input
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ResponsesContent {
    /// Plain text
    Text(String),
    /// Typed parts
    Parts(Vec<ResponsesContentPart>),
}

/// Typed content part (`input_text`, `output_text`, `text`, `input_image`)
#[derive(Debug, Clone, Deserialize)]
pub struct ResponsesContentPart {
    /// Part type
    #[serde(rename = "type")]
    pub part_type: String,
    /// Text for text parts
    #[serde(default)]
    pub text: Option<String>,
    /// Image URL for image parts
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Responses-style tool definition
#[derive(Debug, Clone, Deserialize)]
pub struct ResponsesTool {
    /// Tool type; only "function" maps to chat tools
    #[serde(rename = "type")]
    pub tool_type: String,
    /// Function name
    #[serde(default)]
    pub name: Option<String>,
    /// Human-readable description
    #[serde(default)]
    pub description: Option<String>,
    /// JSON Schema for the parameters
    #[serde(default)]
    pub parameters: Option<serde_json::Value>,
    /// Strict schema adherence
    #[serde(default)]
    pub strict: Option<bool>,
}

/// Reasoning settings
#[derive(Debug, Clone, Deserialize)]
pub struct ResponsesReasoning {
    /// Effort level
    #[serde(default)]
    pub effort: Option<String>,
}

// -- Response types --

/// Responses API object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseObject {
    /// `resp_`-prefixed identifier
    pub id: String,
    /// Object type (always "response")
    pub object: String,
    /// Unix timestamp of creation
    pub created_at: u64,
    /// `in_progress`, `completed` or `failed`
    pub status: String,
    /// Client-facing model identifier
    pub model: String,
    /// Output items; the assistant message is always first once completed
    pub output: Vec<ResponseOutputItem>,
    /// Token usage
    pub usage: ResponseUsage,
    /// Failure details
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ResponseError>,
}

/// Error attached to a failed response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseError {
    /// Error code
    pub code: String,
    /// Error message
    pub message: String,
}

/// Output item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseOutputItem {
    /// Assistant message
    Message {
        /// Item identifier
        id: String,
        /// Item status
        status: String,
        /// Always "assistant"
        role: String,
        /// Message content
        content: Vec<ResponseOutputContent>,
    },
    /// Function call requested by the model
    FunctionCall {
        /// Item identifier
        id: String,
        /// Call identifier echoed back in `function_call_output`
        call_id: String,
        /// Function name
        name: String,
        /// JSON-encoded arguments
        arguments: String,
        /// Item status
        status: String,
    },
}

impl ResponseOutputItem {
    /// Item identifier
    pub fn id(&self) -> &str {
        match self {
            Self::Message { id, .. } | Self::FunctionCall { id, .. } => id,
        }
    }
}

/// Content of an output message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseOutputContent {
    /// Generated text
    OutputText {
        /// Text
        text: String,
        /// Annotations (always empty)
        #[serde(default)]
        annotations: Vec<serde_json::Value>,
    },
}

/// Responses usage with nested detail objects
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseUsage {
    /// Prompt tokens
    pub input_tokens: u32,
    /// Prompt token breakdown
    pub input_tokens_details: InputTokensDetails,
    /// Generated tokens
    pub output_tokens: u32,
    /// Generated token breakdown
    pub output_tokens_details: OutputTokensDetails,
    /// Sum of input and output tokens
    pub total_tokens: u32,
}

/// Prompt token breakdown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputTokensDetails {
    /// Tokens served from cache
    pub cached_tokens: u32,
}

/// Generated token breakdown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputTokensDetails {
    /// Tokens spent on reasoning
    pub reasoning_tokens: u32,
}

// -- Streaming types --

/// Typed Responses stream event
///
/// The serde tag produces the `type` field clients dispatch on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ResponsesStreamEvent {
    /// Response accepted
    #[serde(rename = "response.created")]
    Created {
        /// Event position in the stream
        sequence_number: u64,
        /// Snapshot with `status: in_progress`
        response: ResponseObject,
    },
    /// Output item opened
    #[serde(rename = "response.output_item.added")]
    OutputItemAdded {
        /// Event position in the stream
        sequence_number: u64,
        /// Position of the item in `output`
        output_index: u32,
        /// Item with empty content
        item: ResponseOutputItem,
    },
    /// Content part opened inside a message item
    #[serde(rename = "response.content_part.added")]
    ContentPartAdded {
        /// Event position in the stream
        sequence_number: u64,
        /// Message item the part belongs to
        item_id: String,
        /// Position of the item in `output`
        output_index: u32,
        /// Position of the part in the item's content
        content_index: u32,
        /// Part with empty text
        part: ResponseOutputContent,
    },
    /// Text fragment for a message item
    #[serde(rename = "response.output_text.delta")]
    OutputTextDelta {
        /// Event position in the stream
        sequence_number: u64,
        /// Message item the text belongs to
        item_id: String,
        /// Position of the item in `output`
        output_index: u32,
        /// Position of the content part in the item
        content_index: u32,
        /// Text fragment (never cumulative)
        delta: String,
    },
    /// Text of a content part is final
    #[serde(rename = "response.output_text.done")]
    OutputTextDone {
        /// Event position in the stream
        sequence_number: u64,
        /// Message item the text belongs to
        item_id: String,
        /// Position of the item in `output`
        output_index: u32,
        /// Position of the part in the item's content
        content_index: u32,
        /// Assembled text
        text: String,
    },
    /// Content part closed
    #[serde(rename = "response.content_part.done")]
    ContentPartDone {
        /// Event position in the stream
        sequence_number: u64,
        /// Message item the part belongs to
        item_id: String,
        /// Position of the item in `output`
        output_index: u32,
        /// Position of the part in the item's content
        content_index: u32,
        /// Part with the assembled text
        part: ResponseOutputContent,
    },
    /// Output item closed
    #[serde(rename = "response.output_item.done")]
    OutputItemDone {
        /// Event position in the stream
        sequence_number: u64,
        /// Position of the item in `output`
        output_index: u32,
        /// Item with its final content
        item: ResponseOutputItem,
    },
    /// Response finished
    #[serde(rename = "response.completed")]
    Completed {
        /// Event position in the stream
        sequence_number: u64,
        /// Final response object
        response: ResponseObject,
    },
    /// Response aborted by a backend failure
    #[serde(rename = "response.failed")]
    Failed {
        /// Event position in the stream
        sequence_number: u64,
        /// Response object carrying `error`
        response: ResponseObject,
    },
    /// Stream-level error
    #[serde(rename = "error")]
    Error {
        /// Event position in the stream
        sequence_number: u64,
        /// Error code
        code: String,
        /// Error message
        message: String,
    },
}

impl ResponsesStreamEvent {
    /// Value of the `type` field, also used as the SSE `event:` name
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::Created { .. } => "response.created",
            Self::OutputItemAdded { .. } => "response.output_item.added",
            Self::ContentPartAdded { .. } => "response.content_part.added",
            Self::OutputTextDelta { .. } => "response.output_text.delta",
            Self::OutputTextDone { .. } => "response.output_text.done",
            Self::ContentPartDone { .. } => "response.content_part.done",
            Self::OutputItemDone { .. } => "response.output_item.done",
            Self::Completed { .. } => "response.completed",
            Self::Failed { .. } => "response.failed",
            Self::Error { .. } => "error",
        }
    }

    /// Position of the event in the stream
    pub const fn sequence_number(&self) -> u64 {
        match self {
            Self::Created { sequence_number, .. }
            | Self::OutputItemAdded { sequence_number, .. }
            | Self::ContentPartAdded { sequence_number, .. }
            | Self::OutputTextDelta { sequence_number, .. }
            | Self::OutputTextDone { sequence_number, .. }
            | Self::ContentPartDone { sequence_number, .. }
            | Self::OutputItemDone { sequence_number, .. }
            | Self::Completed { sequence_number, .. }
            | Self::Failed { sequence_number, .. }
            | Self::Error { sequence_number, .. } => *sequence_number,
        }
    }
}
