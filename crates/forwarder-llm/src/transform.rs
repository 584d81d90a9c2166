//! Capability-gated request rewriting
//!
//! Decides, per target model, which request fields may be forwarded to the
//! backend. Runs before any backend call; a rejected request never reaches
//! a provider.

use forwarder_registry::ModelCapability;

use crate::error::LlmError;
use crate::types::CompletionRequest;

/// Request ready for a backend, plus what gating changed
#[derive(Debug, Clone, PartialEq)]
pub struct BackendRequest {
    /// Request to send
    pub request: CompletionRequest,
    /// The client asked to stream but the model cannot; the reply must be
    /// buffered and replayed as a single chunk
    pub stream_downgraded: bool,
    /// Tool definitions were removed
    pub tools_stripped: bool,
}

/// Apply capability gating to a chat request
///
/// 1. Tools are dropped entirely (with `tool_choice`) when the model cannot
///    use them, and forwarded untouched when it can. An empty list is never
///    forwarded.
/// 2. `stream` is forced off for models that cannot stream.
/// 3. `reasoning_effort` is dropped for models without reasoning.
/// 4. Messages and sampling parameters pass through unchanged.
///
/// # Errors
///
/// Returns `LlmError::InvalidRequest` if the model is empty or there are no
/// messages
pub fn transform(mut request: CompletionRequest, cap: &ModelCapability) -> Result<BackendRequest, LlmError> {
    validate(&request)?;

    let mut tools_stripped = false;
    match request.tools.take() {
        Some(tools) if tools.is_empty() => {
            request.tool_choice = None;
        }
        Some(tools) if !cap.tools => {
            tracing::info!(model = %cap.model_id, count = tools.len(), "tools stripped for model without tool support");
            request.tool_choice = None;
            tools_stripped = true;
        }
        Some(tools) => request.tools = Some(tools),
        None => request.tool_choice = None,
    }

    let stream_downgraded = request.stream && !cap.streaming;
    if stream_downgraded {
        tracing::info!(model = %cap.model_id, "stream downgraded to buffered reply");
        request.stream = false;
    }

    if !cap.reasoning && let Some(effort) = request.reasoning_effort.take() {
        tracing::info!(model = %cap.model_id, effort = %effort, "reasoning effort dropped for model without reasoning");
    }

    Ok(BackendRequest {
        request,
        stream_downgraded,
        tools_stripped,
    })
}

fn validate(request: &CompletionRequest) -> Result<(), LlmError> {
    if request.model.trim().is_empty() {
        return Err(LlmError::InvalidRequest("model is required".to_owned()));
    }

    if request.messages.is_empty() {
        return Err(LlmError::InvalidRequest("messages must be a non-empty array".to_owned()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use forwarder_registry::ModelKind;

    use super::*;
    use crate::types::{
        CompletionParams, FunctionDefinition, Message, Role, ToolChoice, ToolChoiceMode, ToolDefinition,
    };

    fn cap(streaming: bool, tools: bool, reasoning: bool) -> ModelCapability {
        ModelCapability {
            model_id: "test-model".to_owned(),
            streaming,
            tools,
            reasoning,
            provider: None,
            upstream_model: None,
            kind: ModelKind::Chat,
        }
    }

    fn tool(name: &str) -> ToolDefinition {
        ToolDefinition {
            tool_type: "function".to_owned(),
            function: FunctionDefinition {
                name: name.to_owned(),
                description: Some(format!("{name} tool")),
                parameters: Some(serde_json::json!({"type": "object", "properties": {"q": {"type": "string"}}})),
                strict: None,
            },
        }
    }

    fn request() -> CompletionRequest {
        CompletionRequest {
            model: "test-model".to_owned(),
            messages: vec![Message::text(Role::User, "Say hello!")],
            params: CompletionParams {
                temperature: Some(0.2),
                max_tokens: Some(32),
                ..CompletionParams::default()
            },
            tools: Some(vec![tool("search"), tool("lookup")]),
            tool_choice: Some(ToolChoice::Mode(ToolChoiceMode::Auto)),
            reasoning_effort: Some("high".to_owned()),
            stream: true,
        }
    }

    #[test]
    fn tools_are_absent_for_non_tool_models() {
        let out = transform(request(), &cap(true, false, false)).unwrap();

        assert!(out.tools_stripped);
        assert!(out.request.tools.is_none());
        assert!(out.request.tool_choice.is_none());

        let wire = serde_json::to_value(crate::protocol::openai::OpenAiRequest::from(&out.request)).unwrap();
        assert!(wire.get("tools").is_none());
        assert!(wire.get("tool_choice").is_none());
    }

    #[test]
    fn tools_are_forwarded_verbatim_for_tool_models() {
        let original = request();
        let out = transform(original.clone(), &cap(true, true, false)).unwrap();

        assert!(!out.tools_stripped);
        assert_eq!(out.request.tools, original.tools);
        assert_eq!(out.request.tool_choice, original.tool_choice);
    }

    #[test]
    fn empty_tool_list_is_never_forwarded() {
        let mut req = request();
        req.tools = Some(vec![]);

        let out = transform(req, &cap(true, true, false)).unwrap();

        assert!(out.request.tools.is_none());
        assert!(!out.tools_stripped);
    }

    #[test]
    fn stream_is_forced_off_for_non_streaming_models() {
        let out = transform(request(), &cap(false, false, true)).unwrap();

        assert!(out.stream_downgraded);
        assert!(!out.request.stream);
    }

    #[test]
    fn stream_passes_for_streaming_models() {
        let out = transform(request(), &cap(true, false, false)).unwrap();

        assert!(!out.stream_downgraded);
        assert!(out.request.stream);
    }

    #[test]
    fn reasoning_effort_is_gated() {
        assert_eq!(
            transform(request(), &cap(false, false, true)).unwrap().request.reasoning_effort.as_deref(),
            Some("high")
        );
        assert!(transform(request(), &cap(false, false, false)).unwrap().request.reasoning_effort.is_none());
    }

    #[test]
    fn messages_and_params_pass_through() {
        let original = request();
        let out = transform(original.clone(), &cap(false, false, false)).unwrap();

        assert_eq!(out.request.messages, original.messages);
        assert_eq!(out.request.params, original.params);
        assert_eq!(out.request.model, original.model);
    }

    #[test]
    fn empty_messages_are_rejected() {
        let mut req = request();
        req.messages.clear();

        assert!(matches!(transform(req, &cap(true, true, true)), Err(LlmError::InvalidRequest(_))));
    }

    #[test]
    fn empty_model_is_rejected() {
        let mut req = request();
        req.model = "  ".to_owned();

        assert!(matches!(transform(req, &cap(true, true, true)), Err(LlmError::InvalidRequest(_))));
    }
}
