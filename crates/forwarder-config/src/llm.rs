use std::time::Duration;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::provider::ProviderConfig;

/// Top-level chat/responses backend configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LlmConfig {
    /// Provider used when a model has no routing entry and no provider prefix
    ///
    /// Defaults to the first configured provider
    #[serde(default)]
    pub default_provider: Option<String>,
    /// Backend call timeout (e.g. "60s", "2m")
    #[serde(default)]
    pub timeout: Option<String>,
    /// Provider configurations keyed by name
    #[serde(default)]
    pub providers: IndexMap<String, ProviderConfig>,
}

impl LlmConfig {
    /// Name of the provider that serves unrouted models
    pub fn fallback_provider(&self) -> Option<&str> {
        self.default_provider
            .as_deref()
            .or_else(|| self.providers.keys().next().map(String::as_str))
    }

    /// Parsed backend timeout
    ///
    /// # Errors
    ///
    /// Returns an error if the configured duration string is malformed
    pub fn timeout(&self) -> anyhow::Result<Option<Duration>> {
        self.timeout
            .as_deref()
            .map(|s| duration_str::parse(s).map_err(|e| anyhow::anyhow!("invalid llm.timeout '{s}': {e}")))
            .transpose()
    }
}
