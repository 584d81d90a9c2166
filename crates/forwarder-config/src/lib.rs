#![allow(clippy::must_use_candidate)]

pub mod auth;
pub mod cors;
mod env;
pub mod health;
pub mod imagegen;
pub mod llm;
mod loader;
pub mod models;
pub mod provider;
pub mod server;
pub mod telemetry;

use serde::Deserialize;

pub use auth::*;
pub use cors::*;
pub use health::*;
pub use imagegen::*;
pub use llm::*;
pub use models::*;
pub use provider::*;
pub use server::*;
pub use telemetry::TelemetryConfig;

/// Top-level forwarder configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Chat and responses backend configuration
    #[serde(default)]
    pub llm: LlmConfig,
    /// Image generation backend configuration
    #[serde(default)]
    pub imagegen: ImageGenConfig,
    /// Capability entries extending the built-in model table
    #[serde(default)]
    pub models: Vec<ModelEntryConfig>,
    /// Telemetry configuration
    #[serde(default)]
    pub telemetry: Option<TelemetryConfig>,
}
