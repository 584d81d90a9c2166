use async_trait::async_trait;
use forwarder_config::{ProviderConfig, ProviderType};
use forwarder_core::RequestContext;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use url::Url;

use super::{GenerateParams, GeneratedImage, ImageGenProvider, RawImage};
use crate::error::{ImageGenError, Result};

/// Default `OpenAI` API base URL
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// `OpenAI` image generation provider
pub(crate) struct OpenAiImageGenProvider {
    name: String,
    client: Client,
    api_key: SecretString,
    base_url: Url,
}

impl OpenAiImageGenProvider {
    /// Create a new `OpenAI` image generation provider
    pub fn new(name: String, config: &ProviderConfig, client: Client) -> Result<Self> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            ImageGenError::ConfigError(format!("API key required for image generation provider '{name}'"))
        })?;

        let base_url = match &config.base_url {
            Some(url) => url.clone(),
            None => Url::parse(DEFAULT_BASE_URL).map_err(|e| ImageGenError::ConfigError(e.to_string()))?,
        };

        Ok(Self {
            name,
            client,
            api_key,
            base_url,
        })
    }

    fn generations_url(&self) -> String {
        format!("{}/images/generations", self.base_url.as_str().trim_end_matches('/'))
    }
}

/// Wire format for the `OpenAI` image generation API request
#[derive(Serialize)]
struct OpenAiImageRequest<'a> {
    prompt: &'a str,
    model: &'a str,
    n: u32,
    size: &'a str,
    quality: &'a str,
    response_format: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<&'a str>,
}

/// Wire format for the `OpenAI` image generation API response
#[derive(Deserialize)]
struct OpenAiImageResponse {
    #[serde(default)]
    data: Vec<OpenAiImageData>,
}

#[derive(Deserialize)]
struct OpenAiImageData {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    b64_json: Option<String>,
    #[serde(default)]
    revised_prompt: Option<String>,
}

impl OpenAiImageData {
    fn into_generated(self) -> Option<GeneratedImage> {
        let image = match (self.b64_json, self.url) {
            (Some(b64), _) => RawImage::Base64(b64),
            (None, Some(url)) => RawImage::Url(url),
            (None, None) => return None,
        };

        Some(GeneratedImage {
            image,
            revised_prompt: self.revised_prompt,
        })
    }
}

#[async_trait]
impl ImageGenProvider for OpenAiImageGenProvider {
    async fn generate(&self, params: &GenerateParams<'_>, context: &RequestContext) -> Result<Vec<GeneratedImage>> {
        let request = params.request;
        let wire_request = OpenAiImageRequest {
            prompt: &request.prompt,
            model: params.model,
            n: request.n,
            size: &request.size,
            quality: &request.quality,
            response_format: params.format.as_str(),
            user: request.user.as_deref(),
        };

        tracing::debug!(provider = %self.name, model = %params.model, "sending image generation request");

        let builder = self
            .client
            .post(self.generations_url())
            .bearer_auth(self.api_key.expose_secret())
            .json(&wire_request);
        let response = super::send(&self.name, super::forward_request_id(builder, context)).await?;

        let wire_response: OpenAiImageResponse = response.json().await.map_err(|e| {
            tracing::error!(provider = %self.name, error = %e, "failed to parse image generation response");
            ImageGenError::InternalError(None)
        })?;

        Ok(wire_response
            .data
            .into_iter()
            .filter_map(OpenAiImageData::into_generated)
            .collect())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn provider_type(&self) -> ProviderType {
        ProviderType::Openai
    }
}
