//! Model capability registry
//!
//! A closed table mapping model identifiers to the features their backend
//! supports, plus the routing key used to pick a provider. Built once at
//! startup from the built-in table and any `[[models]]` config entries,
//! then shared read-only across requests.

#![allow(clippy::must_use_candidate)]

mod builtin;

use forwarder_config::ModelEntryConfig;
pub use forwarder_config::ModelKind;
use indexmap::IndexMap;

/// Capability flags and routing key for a single model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelCapability {
    /// Client-facing model identifier
    pub model_id: String,
    /// Backend accepts `stream: true`
    pub streaming: bool,
    /// Backend accepts tool definitions
    pub tools: bool,
    /// Backend emits reasoning output and accepts reasoning effort
    pub reasoning: bool,
    /// Configured provider that serves the model
    pub provider: Option<String>,
    /// Backend model identifier, when it differs from `model_id`
    pub upstream_model: Option<String>,
    /// Chat or image model
    pub kind: ModelKind,
}

impl ModelCapability {
    /// Capabilities assumed for a model that is not in the registry
    pub fn conservative(model_id: &str) -> Self {
        Self {
            model_id: model_id.to_owned(),
            streaming: false,
            tools: false,
            reasoning: false,
            provider: None,
            upstream_model: None,
            kind: ModelKind::Chat,
        }
    }

    /// Model identifier to send to the backend
    pub fn upstream_model(&self) -> &str {
        self.upstream_model.as_deref().unwrap_or(&self.model_id)
    }
}

impl From<&ModelEntryConfig> for ModelCapability {
    fn from(entry: &ModelEntryConfig) -> Self {
        Self {
            model_id: entry.id.clone(),
            streaming: entry.streaming,
            tools: entry.tools,
            reasoning: entry.reasoning,
            provider: entry.provider.clone(),
            upstream_model: entry.upstream_model.clone(),
            kind: entry.kind,
        }
    }
}

/// Registry of known model capabilities
#[derive(Debug, Clone)]
pub struct CapabilityRegistry {
    entries: IndexMap<String, ModelCapability>,
}

impl CapabilityRegistry {
    /// Registry holding only the built-in table
    pub fn builtin() -> Self {
        let entries = builtin::ENTRIES
            .iter()
            .map(|entry| (entry.id.to_owned(), entry.to_capability()))
            .collect();

        Self { entries }
    }

    /// Built-in table extended with configured entries
    ///
    /// A configured entry whose id matches a built-in one replaces it.
    pub fn from_config(models: &[ModelEntryConfig]) -> Self {
        let mut registry = Self::builtin();

        for entry in models {
            if registry.entries.contains_key(&entry.id) {
                tracing::debug!(model = %entry.id, "overriding built-in model capabilities");
            }

            registry.entries.insert(entry.id.clone(), ModelCapability::from(entry));
        }

        registry
    }

    /// Capabilities for a model id, matched exactly
    ///
    /// Unknown ids resolve to [`ModelCapability::conservative`].
    pub fn lookup(&self, model_id: &str) -> ModelCapability {
        self.get(model_id)
            .cloned()
            .unwrap_or_else(|| ModelCapability::conservative(model_id))
    }

    /// Registered entry for a model id, if any
    pub fn get(&self, model_id: &str) -> Option<&ModelCapability> {
        self.entries.get(model_id)
    }

    /// All registered entries in registration order
    pub fn entries(&self) -> impl Iterator<Item = &ModelCapability> {
        self.entries.values()
    }

    /// Registered entries of the given kind
    pub fn entries_of(&self, kind: ModelKind) -> impl Iterator<Item = &ModelCapability> {
        self.entries.values().filter(move |c| c.kind == kind)
    }
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str) -> ModelEntryConfig {
        ModelEntryConfig {
            id: id.to_owned(),
            streaming: true,
            tools: true,
            reasoning: false,
            provider: Some("local".to_owned()),
            upstream_model: None,
            kind: ModelKind::Chat,
        }
    }

    #[test]
    fn unknown_model_is_conservative() {
        let registry = CapabilityRegistry::builtin();
        let cap = registry.lookup("acme/unheard-of");

        assert_eq!(cap.model_id, "acme/unheard-of");
        assert!(!cap.streaming);
        assert!(!cap.tools);
        assert!(!cap.reasoning);
        assert_eq!(cap.provider, None);
        assert_eq!(cap.upstream_model(), "acme/unheard-of");
    }

    #[test]
    fn gpt_oss_is_reasoning_only() {
        let registry = CapabilityRegistry::builtin();
        let cap = registry.lookup("@cf/openai/gpt-oss-20b");

        assert!(!cap.streaming);
        assert!(!cap.tools);
        assert!(cap.reasoning);
    }

    #[test]
    fn lookup_is_exact() {
        let registry = CapabilityRegistry::builtin();

        assert!(registry.get("@cf/meta/llama-3.3-70b-instruct-fp8-fast").is_some());
        assert!(registry.get("@CF/meta/llama-3.3-70b-instruct-fp8-fast").is_none());
        assert!(registry.get("llama-3.3-70b-instruct-fp8-fast").is_none());
    }

    #[test]
    fn image_aliases_route_to_backend_model() {
        let registry = CapabilityRegistry::builtin();
        let cap = registry.lookup("dall-e-3");

        assert_eq!(cap.kind, ModelKind::Image);
        assert_eq!(cap.upstream_model(), "@cf/black-forest-labs/flux-1-schnell");
    }

    #[test]
    fn config_entries_extend_and_override() {
        let mut gpt_oss = entry("@cf/openai/gpt-oss-20b");
        gpt_oss.streaming = false;
        let registry = CapabilityRegistry::from_config(&[entry("my-model"), gpt_oss]);

        let custom = registry.lookup("my-model");
        assert!(custom.streaming && custom.tools);
        assert_eq!(custom.provider.as_deref(), Some("local"));

        let overridden = registry.lookup("@cf/openai/gpt-oss-20b");
        assert!(overridden.tools);
        assert!(!overridden.reasoning);
    }

    #[test]
    fn entries_of_filters_by_kind() {
        let registry = CapabilityRegistry::builtin();

        assert!(registry.entries_of(ModelKind::Image).all(|c| c.kind == ModelKind::Image));
        assert!(registry.entries_of(ModelKind::Chat).any(|c| c.model_id == "@cf/openai/gpt-oss-120b"));
    }
}
