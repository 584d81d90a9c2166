use std::path::Path;

use secrecy::ExposeSecret;

use crate::{Config, ProviderConfig, ProviderType};

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Reads the file, expands `{{ env.VAR }}` placeholders, then
    /// deserializes and validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, environment variable
    /// expansion fails, TOML parsing fails, or validation fails
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

        Self::from_toml(&raw)
    }

    /// Parse and validate configuration from TOML text
    ///
    /// # Errors
    ///
    /// Returns an error if expansion, parsing, or validation fails
    pub fn from_toml(raw: &str) -> anyhow::Result<Self> {
        let expanded =
            crate::env::expand_env(raw).map_err(|e| anyhow::anyhow!("config variable expansion failed: {e}"))?;

        let config: Self = toml::from_str(&expanded).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate that the configuration is internally consistent
    ///
    /// # Errors
    ///
    /// Returns an error if no backend is configured, a provider reference
    /// is dangling, or a provider is missing required settings
    pub fn validate(&self) -> anyhow::Result<()> {
        self.validate_has_backends()?;
        self.validate_llm_config()?;
        self.validate_model_entries()?;
        self.validate_auth_config()?;
        Ok(())
    }

    /// Ensure at least one backend provider is configured
    fn validate_has_backends(&self) -> anyhow::Result<()> {
        if self.llm.providers.is_empty() && self.imagegen.providers.is_empty() {
            anyhow::bail!("at least one backend must be configured (llm or imagegen provider)");
        }

        Ok(())
    }

    fn validate_llm_config(&self) -> anyhow::Result<()> {
        if let Some(ref name) = self.llm.default_provider
            && !self.llm.providers.contains_key(name)
        {
            anyhow::bail!("llm.default_provider '{name}' is not a configured llm provider");
        }

        self.llm.timeout()?;
        self.imagegen.timeout()?;

        let all = self.llm.providers.iter().chain(self.imagegen.providers.iter());
        for (name, provider) in all {
            validate_provider(name, provider)?;
        }

        Ok(())
    }

    /// Every `[[models]]` provider must exist in the section that serves its kind
    fn validate_model_entries(&self) -> anyhow::Result<()> {
        for entry in &self.models {
            if entry.id.trim().is_empty() {
                anyhow::bail!("model entries must have a non-empty id");
            }

            let Some(ref provider) = entry.provider else {
                continue;
            };

            let known = match entry.kind {
                crate::ModelKind::Chat => self.llm.providers.contains_key(provider),
                crate::ModelKind::Image => self.imagegen.providers.contains_key(provider),
            };

            if !known {
                anyhow::bail!("model '{}' references unknown provider '{provider}'", entry.id);
            }
        }

        Ok(())
    }

    /// Validate auth configuration when auth is enabled
    fn validate_auth_config(&self) -> anyhow::Result<()> {
        let Some(ref auth) = self.server.auth else {
            return Ok(());
        };

        if !auth.enabled {
            return Ok(());
        }

        if !auth.api_keys.iter().any(|k| !k.expose_secret().trim().is_empty()) {
            anyhow::bail!("server.auth.api_keys must contain at least one non-empty key when auth is enabled");
        }

        Ok(())
    }
}

fn validate_provider(name: &str, provider: &ProviderConfig) -> anyhow::Result<()> {
    if provider.provider_type == ProviderType::WorkersAi
        && provider.account_id.as_deref().is_none_or(|id| id.trim().is_empty())
    {
        anyhow::bail!("provider '{name}' of type workers_ai requires account_id");
    }

    Ok(())
}
