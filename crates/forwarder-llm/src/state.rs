//! Shared state, model routing and backend dispatch

use std::sync::Arc;

use forwarder_config::LlmConfig;
use forwarder_core::RequestContext;
use forwarder_registry::{CapabilityRegistry, ModelCapability, ModelKind};
use indexmap::IndexMap;

use crate::error::LlmError;
use crate::provider::{self, EventStream, Provider};
use crate::transform::{BackendRequest, transform};
use crate::types::{BackendReply, CompletionRequest};

/// Shared state for chat and responses route handlers
#[derive(Clone)]
pub struct LlmState {
    pub(crate) inner: Arc<LlmStateInner>,
}

pub(crate) struct LlmStateInner {
    pub(crate) registry: Arc<CapabilityRegistry>,
    pub(crate) providers: IndexMap<String, Arc<dyn Provider>>,
    pub(crate) fallback_provider: Option<String>,
}

/// Where a model id resolves to
#[derive(Clone)]
pub struct Route {
    /// Configured provider name
    pub provider_name: String,
    /// Provider serving the model
    pub provider: Arc<dyn Provider>,
    /// Model id sent to the backend
    pub upstream_model: String,
    /// Capabilities the request is gated against
    pub capability: ModelCapability,
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("provider_name", &self.provider_name)
            .field("upstream_model", &self.upstream_model)
            .field("capability", &self.capability)
            .finish_non_exhaustive()
    }
}

/// Backend reply for a streaming client
pub enum ChatReply {
    /// Model streamed natively
    Stream(EventStream),
    /// Model cannot stream; the complete reply is replayed as one chunk
    Complete(BackendReply),
}

impl LlmState {
    /// Build state from configuration, constructing all providers
    ///
    /// # Errors
    ///
    /// Returns an error if the timeout is malformed or a provider fails to
    /// initialize
    pub fn from_config(config: &LlmConfig, registry: Arc<CapabilityRegistry>) -> Result<Self, LlmError> {
        let client = provider::build_client(config.timeout()?)?;

        let mut providers = IndexMap::new();
        for (name, provider_config) in &config.providers {
            let provider = provider::create_provider(name, provider_config, client.clone())?;
            tracing::debug!(provider = %name, "chat provider initialized");
            providers.insert(name.clone(), provider);
        }

        let fallback_provider = config.fallback_provider().map(str::to_owned);
        Ok(Self::new(registry, providers, fallback_provider))
    }

    /// Build state from already-constructed providers
    pub fn new(
        registry: Arc<CapabilityRegistry>,
        providers: IndexMap<String, Arc<dyn Provider>>,
        fallback_provider: Option<String>,
    ) -> Self {
        let fallback_provider = fallback_provider.or_else(|| providers.keys().next().cloned());

        Self {
            inner: Arc::new(LlmStateInner {
                registry,
                providers,
                fallback_provider,
            }),
        }
    }

    /// Capability registry shared with the rest of the server
    pub fn registry(&self) -> &CapabilityRegistry {
        &self.inner.registry
    }

    /// Provider name a registry entry routes to
    pub(crate) fn owner_of<'a>(&'a self, cap: &'a ModelCapability) -> Option<&'a str> {
        cap.provider.as_deref().or(match cap.kind {
            ModelKind::Chat => self.inner.fallback_provider.as_deref(),
            ModelKind::Image => None,
        })
    }

    /// Resolve a client model id to a provider, upstream id and capabilities
    ///
    /// Order: registry entry's provider, then a `provider/model` prefix naming
    /// a configured provider (stripped before forwarding), then the fallback
    /// provider. Unknown models resolve with conservative capabilities.
    ///
    /// # Errors
    ///
    /// Returns an error if the model is empty or names an image model, or if
    /// no provider can serve it
    pub fn resolve(&self, model: &str) -> Result<Route, LlmError> {
        if model.trim().is_empty() {
            return Err(LlmError::InvalidRequest("model is required".to_owned()));
        }

        let registry = &self.inner.registry;
        let prefixed = model
            .split_once('/')
            .filter(|(prefix, rest)| !rest.is_empty() && self.inner.providers.contains_key(*prefix));

        let capability = registry
            .get(model)
            .or_else(|| prefixed.and_then(|(_, rest)| registry.get(rest)))
            .cloned()
            .map(|mut cap| {
                model.clone_into(&mut cap.model_id);
                cap
            })
            .unwrap_or_else(|| ModelCapability::conservative(model));

        if capability.kind == ModelKind::Image {
            return Err(LlmError::InvalidRequest(format!(
                "model '{model}' is an image generation model"
            )));
        }

        let provider_name = capability
            .provider
            .clone()
            .or_else(|| prefixed.map(|(prefix, _)| prefix.to_owned()))
            .or_else(|| self.inner.fallback_provider.clone())
            .ok_or_else(|| LlmError::ModelNotFound { model: model.to_owned() })?;

        let provider = self
            .inner
            .providers
            .get(&provider_name)
            .cloned()
            .ok_or_else(|| LlmError::ProviderNotFound {
                provider: provider_name.clone(),
            })?;

        let upstream_model = capability
            .upstream_model
            .clone()
            .unwrap_or_else(|| prefixed.map_or(model, |(_, rest)| rest).to_owned());

        Ok(Route {
            provider_name,
            provider,
            upstream_model,
            capability,
        })
    }

    fn prepare(&self, request: CompletionRequest) -> Result<(Route, BackendRequest), LlmError> {
        let route = self.resolve(&request.model)?;
        let mut backend = transform(request, &route.capability)?;
        backend.request.model.clone_from(&route.upstream_model);

        tracing::debug!(
            provider = %route.provider_name,
            model = %route.capability.model_id,
            upstream_model = %route.upstream_model,
            "routing chat request"
        );

        Ok((route, backend))
    }

    /// Execute a non-streaming completion
    ///
    /// # Errors
    ///
    /// Returns an error if the request is invalid or the backend call fails
    pub async fn complete(
        &self,
        mut request: CompletionRequest,
        context: &RequestContext,
    ) -> Result<(ModelCapability, BackendReply), LlmError> {
        request.stream = false;
        let (route, backend) = self.prepare(request)?;

        let raw = route.provider.complete(&backend.request, context).await?;
        Ok((route.capability, raw.into()))
    }

    /// Execute a completion for a streaming client
    ///
    /// Models that cannot stream are called without streaming and their
    /// complete reply is returned for replay.
    ///
    /// # Errors
    ///
    /// Returns an error if the request is invalid or the backend call fails
    /// before streaming starts
    pub async fn complete_stream(
        &self,
        mut request: CompletionRequest,
        context: &RequestContext,
    ) -> Result<(ModelCapability, ChatReply), LlmError> {
        request.stream = true;
        let (route, backend) = self.prepare(request)?;

        if backend.stream_downgraded {
            let raw = route.provider.complete(&backend.request, context).await?;
            return Ok((route.capability, ChatReply::Complete(raw.into())));
        }

        let stream = route.provider.complete_stream(&backend.request, context).await?;
        Ok((route.capability, ChatReply::Stream(stream)))
    }
}
