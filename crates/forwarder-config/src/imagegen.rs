use std::time::Duration;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::provider::ProviderConfig;

/// Top-level image generation configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImageGenConfig {
    /// Backend call timeout (e.g. "120s"); falls back to `llm.timeout`
    #[serde(default)]
    pub timeout: Option<String>,
    /// Image generation provider configurations keyed by name
    #[serde(default)]
    pub providers: IndexMap<String, ProviderConfig>,
}

impl ImageGenConfig {
    /// Parsed backend timeout
    ///
    /// # Errors
    ///
    /// Returns an error if the configured duration string is malformed
    pub fn timeout(&self) -> anyhow::Result<Option<Duration>> {
        self.timeout
            .as_deref()
            .map(|s| duration_str::parse(s).map_err(|e| anyhow::anyhow!("invalid imagegen.timeout '{s}': {e}")))
            .transpose()
    }
}
