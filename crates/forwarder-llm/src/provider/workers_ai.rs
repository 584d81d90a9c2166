//! Cloudflare Workers AI provider implementation

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use forwarder_config::ProviderConfig;
use forwarder_core::RequestContext;
use futures_util::StreamExt;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use url::Url;

use super::{EventStream, Provider, RawReply};
use crate::convert::workers_ai::workers_ai_chunk_to_events;
use crate::error::LlmError;
use crate::protocol::workers_ai::{WorkersAiEnvelope, WorkersAiRequest, WorkersAiResult, WorkersAiStreamChunk};
use crate::types::{CompletionRequest, StreamEvent};

/// Default Cloudflare API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.cloudflare.com/client/v4";

/// Workers AI provider
pub struct WorkersAiProvider {
    name: String,
    client: Client,
    base_url: Url,
    account_id: String,
    api_key: Option<SecretString>,
}

impl WorkersAiProvider {
    /// Create from provider configuration
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Internal` if `account_id` is missing
    pub fn new(name: String, config: &ProviderConfig, client: Client) -> Result<Self, LlmError> {
        let base_url = match &config.base_url {
            Some(url) => url.clone(),
            None => Url::parse(DEFAULT_BASE_URL).map_err(|e| LlmError::Internal(e.into()))?,
        };

        let account_id = config
            .account_id
            .clone()
            .ok_or_else(|| LlmError::Internal(anyhow::anyhow!("provider '{name}' requires account_id")))?;

        Ok(Self {
            name,
            client,
            base_url,
            account_id,
            api_key: config.api_key.clone(),
        })
    }

    /// `{base}/accounts/{account_id}/ai/run/{model}`
    ///
    /// Model ids such as `@cf/meta/...` keep their slashes.
    fn run_url(&self, model: &str) -> String {
        let base = self.base_url.as_str().trim_end_matches('/');
        format!("{base}/accounts/{}/ai/run/{model}", self.account_id)
    }

    fn request(&self, request: &CompletionRequest, context: &RequestContext) -> reqwest::RequestBuilder {
        let body = WorkersAiRequest::from(request);
        let mut builder = self.client.post(self.run_url(&request.model)).json(&body);

        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key.expose_secret());
        }

        super::forward_request_id(builder, context)
    }
}

#[async_trait]
impl Provider for WorkersAiProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: &CompletionRequest, context: &RequestContext) -> Result<RawReply, LlmError> {
        let response = super::send(&self.name, self.request(request, context)).await?;

        let envelope: WorkersAiEnvelope<WorkersAiResult> = response
            .json()
            .await
            .map_err(|e| LlmError::Upstream(format!("failed to parse response: {e}")))?;

        unwrap_envelope(&self.name, envelope).map(RawReply::WorkersAi)
    }

    async fn complete_stream(
        &self,
        request: &CompletionRequest,
        context: &RequestContext,
    ) -> Result<EventStream, LlmError> {
        let response = super::send(&self.name, self.request(request, context)).await?;

        // Tool call numbering runs across the whole stream
        let mapped = response
            .bytes_stream()
            .eventsource()
            .scan(0u32, |next_tool_index, result| {
                futures_util::future::ready(Some(match result {
                    Ok(event) => parse_sse_data(event.data.trim(), next_tool_index),
                    Err(e) => vec![Err(LlmError::Streaming(e.to_string()))],
                }))
            })
            .flat_map(futures_util::stream::iter);

        Ok(Box::pin(mapped))
    }
}

/// Extract `result`, turning `success: false` into a backend error
pub(crate) fn unwrap_envelope<T>(provider: &str, envelope: WorkersAiEnvelope<T>) -> Result<T, LlmError> {
    let failed = envelope.success == Some(false);

    match envelope.result {
        Some(result) if !failed => Ok(result),
        _ => {
            let message = envelope
                .errors
                .iter()
                .map(|e| match e.code {
                    Some(code) => format!("{code}: {}", e.message),
                    None => e.message.clone(),
                })
                .collect::<Vec<_>>()
                .join("; ");

            tracing::warn!(provider = %provider, errors = %message, "workers ai call unsuccessful");

            Err(LlmError::Upstream(if message.is_empty() {
                "backend reported failure without details".to_owned()
            } else {
                message
            }))
        }
    }
}

fn parse_sse_data(data: &str, next_tool_index: &mut u32) -> Vec<Result<StreamEvent, LlmError>> {
    if data == "[DONE]" {
        return vec![Ok(StreamEvent::Done)];
    }

    match serde_json::from_str::<WorkersAiStreamChunk>(data) {
        Ok(chunk) => workers_ai_chunk_to_events(chunk, next_tool_index)
            .into_iter()
            .map(Ok)
            .collect(),
        Err(e) => {
            tracing::debug!(error = %e, data = %data, "skipping unparseable SSE chunk");
            vec![]
        }
    }
}
