use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use forwarder_config::ProviderType;
use forwarder_core::RequestContext;
use forwarder_registry::{CapabilityRegistry, ModelKind};
use indexmap::IndexMap;
use reqwest::Client;

use crate::error::{ImageGenError, Result};
use crate::normalize::to_image_data;
use crate::provider::openai::OpenAiImageGenProvider;
use crate::provider::workers_ai::WorkersAiImageGenProvider;
use crate::provider::{GenerateParams, ImageGenProvider};
use crate::types::{ImageRequest, ImageResponse};

/// Image generation server that routes requests to the appropriate provider
pub struct Server {
    providers: IndexMap<String, Arc<dyn ImageGenProvider>>,
    registry: Arc<CapabilityRegistry>,
    client: Client,
}

/// Provider and backend model chosen for a request
struct ImageRoute<'a> {
    provider: &'a Arc<dyn ImageGenProvider>,
    model: String,
}

impl Server {
    pub(crate) fn new(
        providers: IndexMap<String, Arc<dyn ImageGenProvider>>,
        registry: Arc<CapabilityRegistry>,
        client: Client,
    ) -> Self {
        Self {
            providers,
            registry,
            client,
        }
    }

    /// Generate images using the appropriate provider
    ///
    /// The model resolves through the registry first: an entry's provider
    /// and upstream model win. Built-in aliases without a provider go to
    /// the first Workers AI provider; when none is configured the alias is
    /// forwarded unchanged. Otherwise a `provider/model` prefix naming a
    /// configured provider selects it, and the first provider serves the
    /// rest.
    pub async fn generate(&self, request: &ImageRequest, context: &RequestContext) -> Result<ImageResponse> {
        let (size, format) = request.validate()?;
        let route = self.resolve(&request.model)?;

        tracing::debug!(
            provider = %route.provider.name(),
            model = %request.model,
            upstream_model = %route.model,
            n = request.n,
            "routing image generation request"
        );

        let params = GenerateParams {
            request,
            model: &route.model,
            size,
            format,
        };
        let images = route.provider.generate(&params, context).await?;

        if images.is_empty() {
            return Err(ImageGenError::ProviderApiError {
                status: 502,
                message: "provider returned no images".to_owned(),
            });
        }

        let mut data = Vec::with_capacity(images.len());
        for image in images {
            data.push(to_image_data(image, format, &self.client).await?);
        }

        Ok(ImageResponse {
            created: SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |d| d.as_secs()),
            model: request.model.clone(),
            data,
        })
    }

    fn resolve(&self, model: &str) -> Result<ImageRoute<'_>> {
        let prefixed = model
            .split_once('/')
            .filter(|(prefix, rest)| !rest.is_empty() && self.providers.contains_key(*prefix));

        let capability = self
            .registry
            .get(model)
            .or_else(|| prefixed.and_then(|(_, rest)| self.registry.get(rest)));

        if let Some(cap) = capability {
            if cap.kind != ModelKind::Image {
                return Err(ImageGenError::InvalidRequest(format!(
                    "model '{model}' is not an image generation model"
                )));
            }

            if let Some(name) = &cap.provider {
                let provider = self
                    .providers
                    .get(name)
                    .ok_or_else(|| ImageGenError::ProviderNotFound(name.clone()))?;
                return Ok(ImageRoute {
                    provider,
                    model: cap.upstream_model().to_owned(),
                });
            }

            if prefixed.is_none()
                && let Some(upstream) = &cap.upstream_model
                && let Some(provider) = self
                    .providers
                    .values()
                    .find(|p| p.provider_type() == ProviderType::WorkersAi)
            {
                return Ok(ImageRoute {
                    provider,
                    model: upstream.clone(),
                });
            }
        }

        if let Some((prefix, rest)) = prefixed {
            return Ok(ImageRoute {
                provider: &self.providers[prefix],
                model: rest.to_owned(),
            });
        }

        let provider = self
            .providers
            .values()
            .next()
            .ok_or_else(|| ImageGenError::ProviderNotFound("no image generation providers configured".to_owned()))?;

        Ok(ImageRoute {
            provider,
            model: model.to_owned(),
        })
    }
}

/// Builder for constructing the image generation server from configuration
pub struct ImageGenServerBuilder<'a> {
    config: &'a forwarder_config::Config,
    registry: Arc<CapabilityRegistry>,
}

impl<'a> ImageGenServerBuilder<'a> {
    pub fn new(config: &'a forwarder_config::Config, registry: Arc<CapabilityRegistry>) -> Self {
        Self { config, registry }
    }

    pub fn build(self) -> Result<Server> {
        let client = build_client(client_timeout(self.config)?)?;

        let mut providers: IndexMap<String, Arc<dyn ImageGenProvider>> = IndexMap::new();

        for (name, provider_config) in &self.config.imagegen.providers {
            tracing::debug!(provider = %name, "initializing image generation provider");

            let provider: Arc<dyn ImageGenProvider> = match provider_config.provider_type {
                ProviderType::Openai => {
                    Arc::new(OpenAiImageGenProvider::new(name.clone(), provider_config, client.clone())?)
                }
                ProviderType::WorkersAi => {
                    Arc::new(WorkersAiImageGenProvider::new(name.clone(), provider_config, client.clone())?)
                }
            };

            providers.insert(name.clone(), provider);
        }

        if providers.is_empty() {
            tracing::debug!("no image generation providers configured");
        } else {
            tracing::debug!(count = providers.len(), "image generation server initialized");
        }

        Ok(Server::new(providers, self.registry, client))
    }
}

/// Image call timeout: `imagegen.timeout`, else `llm.timeout`
fn client_timeout(config: &forwarder_config::Config) -> Result<Option<Duration>> {
    let timeout = match config.imagegen.timeout() {
        Ok(None) => config.llm.timeout(),
        other => other,
    };

    timeout.map_err(|e| ImageGenError::ConfigError(e.to_string()))
}

fn build_client(timeout: Option<Duration>) -> Result<Client> {
    let mut builder = Client::builder();

    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }

    builder
        .build()
        .map_err(|e| ImageGenError::ConfigError(format!("failed to build HTTP client: {e}")))
}
