//! Workers AI text-to-image models
//!
//! Each call produces one image, so `n > 1` issues `n` sequential calls.
//! Models answer either with a JSON envelope carrying base64 text or with
//! raw image bytes.

use async_trait::async_trait;
use forwarder_config::{ProviderConfig, ProviderType};
use forwarder_core::RequestContext;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use url::Url;

use super::{GenerateParams, GeneratedImage, ImageGenProvider, RawImage};
use crate::error::{ImageGenError, Result};

const DEFAULT_BASE_URL: &str = "https://api.cloudflare.com/client/v4";

pub(crate) struct WorkersAiImageGenProvider {
    name: String,
    client: Client,
    base_url: Url,
    account_id: String,
    api_key: Option<SecretString>,
}

#[derive(Serialize)]
struct WorkersAiImageRequest<'a> {
    prompt: &'a str,
    width: u32,
    height: u32,
}

#[derive(Deserialize)]
struct WorkersAiImageEnvelope {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    result: Option<WorkersAiImageResult>,
    #[serde(default)]
    errors: Vec<WorkersAiApiError>,
}

#[derive(Deserialize)]
struct WorkersAiImageResult {
    #[serde(default)]
    image: Option<String>,
}

#[derive(Deserialize)]
struct WorkersAiApiError {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

impl WorkersAiImageGenProvider {
    pub fn new(name: String, config: &ProviderConfig, client: Client) -> Result<Self> {
        let account_id = config
            .account_id
            .clone()
            .ok_or_else(|| ImageGenError::ConfigError(format!("provider '{name}' requires account_id")))?;

        let base_url = match &config.base_url {
            Some(url) => url.clone(),
            None => Url::parse(DEFAULT_BASE_URL).map_err(|e| ImageGenError::ConfigError(e.to_string()))?,
        };

        Ok(Self {
            name,
            client,
            base_url,
            account_id,
            api_key: config.api_key.clone(),
        })
    }

    fn run_url(&self, model: &str) -> String {
        let base = self.base_url.as_str().trim_end_matches('/');
        format!("{base}/accounts/{}/ai/run/{model}", self.account_id)
    }

    async fn generate_one(&self, params: &GenerateParams<'_>, context: &RequestContext) -> Result<RawImage> {
        let body = WorkersAiImageRequest {
            prompt: &params.request.prompt,
            width: params.size.width,
            height: params.size.height,
        };

        let mut builder = self.client.post(self.run_url(params.model)).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key.expose_secret());
        }

        let response = super::send(&self.name, super::forward_request_id(builder, context)).await?;

        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("application/json"));

        if is_json {
            let envelope: WorkersAiImageEnvelope = response.json().await.map_err(|e| {
                tracing::error!(provider = %self.name, error = %e, "failed to parse image generation response");
                ImageGenError::InternalError(None)
            })?;
            return image_from_envelope(&self.name, envelope);
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ImageGenError::ConnectionError(format!("failed to read image from '{}': {e}", self.name)))?;

        if bytes.is_empty() {
            return Err(ImageGenError::ProviderApiError {
                status: 502,
                message: "provider returned an empty image".to_owned(),
            });
        }

        Ok(RawImage::Bytes(bytes.to_vec()))
    }
}

fn image_from_envelope(provider: &str, envelope: WorkersAiImageEnvelope) -> Result<RawImage> {
    let image = envelope
        .result
        .and_then(|r| r.image)
        .filter(|image| envelope.success != Some(false) && !image.is_empty());

    image.map(RawImage::Base64).ok_or_else(|| {
        let message = if envelope.errors.is_empty() {
            "provider returned no image".to_owned()
        } else {
            envelope
                .errors
                .iter()
                .map(|e| format!("{}: {}", e.code, e.message))
                .collect::<Vec<_>>()
                .join("; ")
        };

        tracing::warn!(provider = %provider, error = %message, "image provider reported failure");
        ImageGenError::ProviderApiError { status: 502, message }
    })
}

#[async_trait]
impl ImageGenProvider for WorkersAiImageGenProvider {
    async fn generate(&self, params: &GenerateParams<'_>, context: &RequestContext) -> Result<Vec<GeneratedImage>> {
        tracing::debug!(
            provider = %self.name,
            model = %params.model,
            n = params.request.n,
            "sending image generation request"
        );

        let mut images = Vec::new();
        for _ in 0..params.request.n {
            images.push(GeneratedImage::new(self.generate_one(params, context).await?));
        }

        Ok(images)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn provider_type(&self) -> ProviderType {
        ProviderType::WorkersAi
    }
}
