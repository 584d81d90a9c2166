use super::message::ToolCall;
use super::response::{FinishReason, Usage};

/// Canonical backend reply
///
/// Every provider's raw reply shape converts into this at the boundary;
/// the normalizers and adapters only ever see this form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendReply {
    /// Model the backend reports having used
    pub model: Option<String>,
    /// Assistant text, possibly missing or empty
    pub content: Option<String>,
    /// Reasoning/thinking text
    pub reasoning: Option<String>,
    /// Tool calls requested by the model
    pub tool_calls: Vec<ToolCall>,
    /// Backend finish signal
    pub finish: Option<FinishReason>,
    /// Token usage, if reported
    pub usage: Option<Usage>,
}

impl BackendReply {
    /// Plain text reply
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    /// Whether the reply carries at least one tool call
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    /// Whether the reply has no usable text and no tool calls
    pub fn is_degenerate(&self) -> bool {
        !self.has_tool_calls() && self.content.as_deref().is_none_or(str::is_empty)
    }
}
