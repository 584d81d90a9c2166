use serde::Deserialize;

/// A `[[models]]` capability entry
///
/// Entries with an `id` already present in the built-in table replace it
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelEntryConfig {
    /// Client-facing model identifier, matched exactly
    pub id: String,
    /// Whether the backend can stream this model
    #[serde(default)]
    pub streaming: bool,
    /// Whether the backend accepts tool definitions for this model
    #[serde(default)]
    pub tools: bool,
    /// Whether the model emits reasoning output
    #[serde(default)]
    pub reasoning: bool,
    /// Configured provider that serves this model
    #[serde(default)]
    pub provider: Option<String>,
    /// Backend model identifier, when it differs from `id`
    #[serde(default)]
    pub upstream_model: Option<String>,
    /// Whether this is a chat or image model
    #[serde(default)]
    pub kind: ModelKind,
}

/// Model family
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// Chat/responses text generation
    #[default]
    Chat,
    /// Image generation
    Image,
}
