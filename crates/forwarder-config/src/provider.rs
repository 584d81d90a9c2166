use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

/// Configuration for a single backend provider
///
/// Shared by `[llm.providers.*]` and `[imagegen.providers.*]`
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// Provider protocol type
    #[serde(rename = "type")]
    pub provider_type: ProviderType,
    /// API key for authentication
    #[serde(default)]
    pub api_key: Option<SecretString>,
    /// Base URL override
    #[serde(default)]
    pub base_url: Option<Url>,
    /// Cloudflare account identifier (Workers AI only)
    #[serde(default)]
    pub account_id: Option<String>,
}

/// Supported backend protocols
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderType {
    /// OpenAI-compatible API
    Openai,
    /// Cloudflare Workers AI `ai/run` API
    WorkersAi,
}
