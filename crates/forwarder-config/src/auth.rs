use secrecy::SecretString;
use serde::Deserialize;

/// Bearer-key authentication configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// Whether bearer authentication is enforced
    #[serde(default)]
    pub enabled: bool,

    /// Accepted API keys
    #[serde(default)]
    pub api_keys: Vec<SecretString>,

    /// Paths that skip authentication
    #[serde(default = "default_public_paths")]
    pub public_paths: Vec<String>,
}

fn default_public_paths() -> Vec<String> {
    vec!["/health".to_string()]
}
