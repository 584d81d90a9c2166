pub(crate) mod openai;
pub(crate) mod workers_ai;

use async_trait::async_trait;
use forwarder_config::ProviderType;
use forwarder_core::{REQUEST_ID_HEADER, RequestContext};

use crate::error::{ImageGenError, Result};
use crate::types::{ImageRequest, ImageSize, ResponseFormat};

/// Validated request with the backend model resolved
#[derive(Debug, Clone, Copy)]
pub(crate) struct GenerateParams<'a> {
    /// Original client request
    pub request: &'a ImageRequest,
    /// Model id sent to the backend
    pub model: &'a str,
    pub size: ImageSize,
    pub format: ResponseFormat,
}

/// Image as a backend produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RawImage {
    /// Hosted image or data URL
    Url(String),
    /// Base64 text without a data URL prefix
    Base64(String),
    /// Raw encoded image bytes
    Bytes(Vec<u8>),
}

/// One generated image
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct GeneratedImage {
    pub image: RawImage,
    pub revised_prompt: Option<String>,
}

impl GeneratedImage {
    pub(crate) const fn new(image: RawImage) -> Self {
        Self {
            image,
            revised_prompt: None,
        }
    }
}

/// Trait for image generation provider implementations
#[async_trait]
pub(crate) trait ImageGenProvider: Send + Sync {
    /// Generate `params.request.n` images
    async fn generate(&self, params: &GenerateParams<'_>, context: &RequestContext) -> Result<Vec<GeneratedImage>>;

    /// Get the provider name
    fn name(&self) -> &str;

    /// Backend protocol
    fn provider_type(&self) -> ProviderType;
}

/// Attach the client's correlation id to an outbound request
fn forward_request_id(builder: reqwest::RequestBuilder, context: &RequestContext) -> reqwest::RequestBuilder {
    match context.request_id() {
        Some(id) => builder.header(REQUEST_ID_HEADER, id),
        None => builder,
    }
}

/// Send a request, classifying transport failures and non-success statuses
async fn send(provider: &str, builder: reqwest::RequestBuilder) -> Result<reqwest::Response> {
    let response = builder.send().await.map_err(|e| {
        tracing::error!(provider = %provider, error = %e, "image generation request failed");
        ImageGenError::ConnectionError(format!("failed to reach image provider '{provider}': {e}"))
    })?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let mut message = response.text().await.unwrap_or_else(|_| "Unknown error".to_owned());
    if message.len() > 512 {
        let mut end = 512;
        while !message.is_char_boundary(end) {
            end -= 1;
        }
        message.truncate(end);
    }

    tracing::error!(provider = %provider, status = %status, "image provider returned error");

    Err(ImageGenError::ProviderApiError {
        status: status.as_u16(),
        message,
    })
}
