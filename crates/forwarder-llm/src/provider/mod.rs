//! Provider trait and implementations for chat backends

pub mod openai;
pub mod workers_ai;

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use forwarder_config::{ProviderConfig, ProviderType};
use forwarder_core::{REQUEST_ID_HEADER, RequestContext};
use futures_util::Stream;

use crate::error::LlmError;
use crate::protocol::openai::OpenAiResponse;
use crate::protocol::workers_ai::WorkersAiResult;
use crate::types::{BackendReply, CompletionRequest, StreamEvent};

/// Stream of canonical events from a backend
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send>>;

/// Reply exactly as a backend shaped it
///
/// Converted into [`BackendReply`] before any normalization happens.
#[derive(Debug, Clone)]
pub enum RawReply {
    /// OpenAI-compatible chat completion
    OpenAi(OpenAiResponse),
    /// Workers AI `result` payload
    WorkersAi(WorkersAiResult),
}

impl From<RawReply> for BackendReply {
    fn from(raw: RawReply) -> Self {
        match raw {
            RawReply::OpenAi(response) => response.into(),
            RawReply::WorkersAi(result) => result.into(),
        }
    }
}

/// Trait implemented by each chat backend
#[async_trait]
pub trait Provider: Send + Sync {
    /// Configured provider name
    fn name(&self) -> &str;

    /// Send a non-streaming completion request
    async fn complete(&self, request: &CompletionRequest, context: &RequestContext) -> Result<RawReply, LlmError>;

    /// Send a streaming completion request
    async fn complete_stream(
        &self,
        request: &CompletionRequest,
        context: &RequestContext,
    ) -> Result<EventStream, LlmError>;
}

/// Build the HTTP client shared by all providers
///
/// The timeout bounds each backend call, streams included.
pub fn build_client(timeout: Option<Duration>) -> Result<reqwest::Client, LlmError> {
    let mut builder = reqwest::Client::builder();

    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }

    builder
        .build()
        .map_err(|e| LlmError::Internal(anyhow::anyhow!("failed to build HTTP client: {e}")))
}

/// Construct a provider from its configuration
pub fn create_provider(
    name: &str,
    config: &ProviderConfig,
    client: reqwest::Client,
) -> Result<Arc<dyn Provider>, LlmError> {
    let provider: Arc<dyn Provider> = match config.provider_type {
        ProviderType::Openai => Arc::new(openai::OpenAiProvider::new(name.to_owned(), config, client)?),
        ProviderType::WorkersAi => Arc::new(workers_ai::WorkersAiProvider::new(name.to_owned(), config, client)?),
    };

    Ok(provider)
}

/// Attach the client's correlation id to an outbound request
pub(crate) fn forward_request_id(
    builder: reqwest::RequestBuilder,
    context: &RequestContext,
) -> reqwest::RequestBuilder {
    match context.request_id() {
        Some(id) => builder.header(REQUEST_ID_HEADER, id),
        None => builder,
    }
}

/// Send a request, classifying transport failures and non-success statuses
pub(crate) async fn send(provider: &str, builder: reqwest::RequestBuilder) -> Result<reqwest::Response, LlmError> {
    let response = builder.send().await.map_err(|e| {
        tracing::error!(provider = %provider, error = %e, "upstream request failed");
        LlmError::Upstream(e.to_string())
    })?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    tracing::warn!(provider = %provider, status = %status, "upstream returned error");

    Err(LlmError::Upstream(format!("provider returned {status}: {}", truncate(&body, 512))))
}

fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }

    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("héllo", 2), "h");
        assert_eq!(truncate("abcdef", 3), "abc");
    }

    #[test]
    fn raw_reply_converts_per_variant() {
        let result: WorkersAiResult = serde_json::from_value(serde_json::json!({"response": "hi"})).unwrap();
        let reply = BackendReply::from(RawReply::WorkersAi(result));

        assert_eq!(reply.content.as_deref(), Some("hi"));
    }
}
