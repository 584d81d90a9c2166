//! Programmatic configuration builder for integration tests

use std::net::SocketAddr;

use forwarder_config::{
    AuthConfig, Config, CorsConfig, HealthConfig, ModelEntryConfig, ModelKind, ProviderConfig, ProviderType,
    ServerConfig,
};
use secrecy::SecretString;

/// Account id the mock Workers AI routes expect
pub const ACCOUNT_ID: &str = "test-account";

/// Builder for constructing test configurations
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder with minimal defaults
    pub fn new() -> Self {
        Self {
            config: Config {
                server: ServerConfig {
                    listen_address: Some(SocketAddr::from(([127, 0, 0, 1], 0))),
                    health: HealthConfig {
                        enabled: true,
                        ..HealthConfig::default()
                    },
                    ..ServerConfig::default()
                },
                ..Config::default()
            },
        }
    }

    /// Add an OpenAI-compatible chat provider pointed at a mock backend
    pub fn with_openai_provider(mut self, name: &str, base_url: &str) -> Self {
        self.config
            .llm
            .providers
            .insert(name.to_owned(), provider(ProviderType::Openai, base_url));
        self
    }

    /// Add a Workers AI chat provider pointed at a mock backend
    pub fn with_workers_ai_provider(mut self, name: &str, base_url: &str) -> Self {
        self.config
            .llm
            .providers
            .insert(name.to_owned(), provider(ProviderType::WorkersAi, base_url));
        self
    }

    /// Add an OpenAI-compatible image provider
    pub fn with_openai_image_provider(mut self, name: &str, base_url: &str) -> Self {
        self.config
            .imagegen
            .providers
            .insert(name.to_owned(), provider(ProviderType::Openai, base_url));
        self
    }

    /// Add a Workers AI image provider
    pub fn with_workers_ai_image_provider(mut self, name: &str, base_url: &str) -> Self {
        self.config
            .imagegen
            .providers
            .insert(name.to_owned(), provider(ProviderType::WorkersAi, base_url));
        self
    }

    /// Bound image backend calls
    pub fn with_imagegen_timeout(mut self, timeout: &str) -> Self {
        self.config.imagegen.timeout = Some(timeout.to_owned());
        self
    }

    /// Register a chat model with explicit capabilities
    pub fn with_chat_model(mut self, id: &str, provider: &str, streaming: bool, tools: bool) -> Self {
        self.config.models.push(ModelEntryConfig {
            id: id.to_owned(),
            streaming,
            tools,
            reasoning: false,
            provider: Some(provider.to_owned()),
            upstream_model: None,
            kind: ModelKind::Chat,
        });
        self
    }

    /// Route all chat models without an entry to `name`
    pub fn with_default_provider(mut self, name: &str) -> Self {
        self.config.llm.default_provider = Some(name.to_owned());
        self
    }

    /// Require one of the given bearer keys
    pub fn with_api_keys(mut self, keys: &[&str]) -> Self {
        self.config.server.auth = Some(AuthConfig {
            enabled: true,
            api_keys: keys.iter().map(|k| SecretString::from((*k).to_owned())).collect(),
            public_paths: vec!["/health".to_owned()],
        });
        self
    }

    /// Set CORS configuration
    pub fn with_cors(mut self, config: CorsConfig) -> Self {
        self.config.server.cors = Some(config);
        self
    }

    /// Disable health endpoint
    pub fn without_health(mut self) -> Self {
        self.config.server.health.enabled = false;
        self
    }

    /// Build the final config
    pub fn build(self) -> Config {
        self.config
    }
}

fn provider(provider_type: ProviderType, base_url: &str) -> ProviderConfig {
    ProviderConfig {
        provider_type,
        api_key: Some(SecretString::from("test-key")),
        base_url: Some(base_url.parse().expect("valid URL")),
        account_id: (provider_type == ProviderType::WorkersAi).then(|| ACCOUNT_ID.to_owned()),
    }
}
