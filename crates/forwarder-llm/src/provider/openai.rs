//! OpenAI-compatible provider implementation

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use forwarder_config::ProviderConfig;
use forwarder_core::RequestContext;
use futures_util::StreamExt;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use url::Url;

use super::{EventStream, Provider, RawReply};
use crate::convert::openai::openai_chunk_to_events;
use crate::error::LlmError;
use crate::protocol::openai::{OpenAiRequest, OpenAiResponse, OpenAiStreamChunk, OpenAiStreamError};
use crate::types::{CompletionRequest, StreamEvent};

/// Default `OpenAI` API base URL
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI-compatible provider
pub struct OpenAiProvider {
    name: String,
    client: Client,
    base_url: Url,
    api_key: Option<SecretString>,
}

impl OpenAiProvider {
    /// Create from provider configuration
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Internal` if the default base URL cannot be parsed
    pub fn new(name: String, config: &ProviderConfig, client: Client) -> Result<Self, LlmError> {
        let base_url = match &config.base_url {
            Some(url) => url.clone(),
            None => Url::parse(DEFAULT_BASE_URL).map_err(|e| LlmError::Internal(e.into()))?,
        };

        Ok(Self {
            name,
            client,
            base_url,
            api_key: config.api_key.clone(),
        })
    }

    /// Build the chat completions URL
    fn completions_url(&self) -> String {
        let base = self.base_url.as_str().trim_end_matches('/');
        format!("{base}/chat/completions")
    }

    fn request(&self, body: &OpenAiRequest, context: &RequestContext) -> reqwest::RequestBuilder {
        let mut builder = self.client.post(self.completions_url()).json(body);

        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key.expose_secret());
        }

        super::forward_request_id(builder, context)
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: &CompletionRequest, context: &RequestContext) -> Result<RawReply, LlmError> {
        let wire_request = OpenAiRequest::from(request);
        let response = super::send(&self.name, self.request(&wire_request, context)).await?;

        let wire_response: OpenAiResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Upstream(format!("failed to parse response: {e}")))?;

        Ok(RawReply::OpenAi(wire_response))
    }

    async fn complete_stream(
        &self,
        request: &CompletionRequest,
        context: &RequestContext,
    ) -> Result<EventStream, LlmError> {
        let mut wire_request = OpenAiRequest::from(request);
        wire_request.stream = Some(true);

        let response = super::send(&self.name, self.request(&wire_request, context)).await?;

        let mapped = response
            .bytes_stream()
            .eventsource()
            .map(|result| match result {
                Ok(event) => parse_sse_data(event.data.trim()),
                Err(e) => vec![Err(LlmError::Streaming(e.to_string()))],
            })
            .flat_map(futures_util::stream::iter);

        Ok(Box::pin(mapped))
    }
}

/// Parse one SSE `data:` payload from an OpenAI-compatible backend
fn parse_sse_data(data: &str) -> Vec<Result<StreamEvent, LlmError>> {
    if data == "[DONE]" {
        return vec![Ok(StreamEvent::Done)];
    }

    match serde_json::from_str::<OpenAiStreamChunk>(data) {
        Ok(chunk) if !chunk.choices.is_empty() || chunk.usage.is_some() => {
            openai_chunk_to_events(&chunk).into_iter().map(Ok).collect()
        }
        _ => match serde_json::from_str::<OpenAiStreamError>(data) {
            Ok(err) => vec![Err(LlmError::Upstream(err.error.to_string()))],
            Err(e) => {
                tracing::debug!(error = %e, data = %data, "skipping unparseable SSE chunk");
                vec![]
            }
        },
    }
}
