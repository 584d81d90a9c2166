use crate::{ModelCapability, ModelKind};

/// Workers AI image model that OpenAI image aliases resolve to
const DEFAULT_IMAGE_MODEL: &str = "@cf/black-forest-labs/flux-1-schnell";

pub(crate) struct BuiltinEntry {
    pub id: &'static str,
    pub streaming: bool,
    pub tools: bool,
    pub reasoning: bool,
    pub upstream_model: Option<&'static str>,
    pub kind: ModelKind,
}

impl BuiltinEntry {
    const fn chat(id: &'static str, streaming: bool, tools: bool, reasoning: bool) -> Self {
        Self {
            id,
            streaming,
            tools,
            reasoning,
            upstream_model: None,
            kind: ModelKind::Chat,
        }
    }

    const fn image(id: &'static str, upstream_model: Option<&'static str>) -> Self {
        Self {
            id,
            streaming: false,
            tools: false,
            reasoning: false,
            upstream_model,
            kind: ModelKind::Image,
        }
    }

    pub fn to_capability(&self) -> ModelCapability {
        ModelCapability {
            model_id: self.id.to_owned(),
            streaming: self.streaming,
            tools: self.tools,
            reasoning: self.reasoning,
            provider: None,
            upstream_model: self.upstream_model.map(ToOwned::to_owned),
            kind: self.kind,
        }
    }
}

/// Flags are `(streaming, tools, reasoning)`
pub(crate) const ENTRIES: &[BuiltinEntry] = &[
    BuiltinEntry::chat("@cf/openai/gpt-oss-20b", false, false, true),
    BuiltinEntry::chat("@cf/openai/gpt-oss-120b", false, false, true),
    BuiltinEntry::chat("@cf/meta/llama-3.3-70b-instruct-fp8-fast", true, true, false),
    BuiltinEntry::chat("@cf/meta/llama-4-scout-17b-16e-instruct", true, true, false),
    BuiltinEntry::chat("@cf/meta/llama-3.1-8b-instruct", true, false, false),
    BuiltinEntry::chat("@cf/meta/llama-3.1-8b-instruct-fast", true, false, false),
    BuiltinEntry::chat("@hf/nousresearch/hermes-2-pro-mistral-7b", true, true, false),
    BuiltinEntry::chat("@cf/mistralai/mistral-small-3.1-24b-instruct", true, true, false),
    BuiltinEntry::chat("@cf/qwen/qwq-32b", true, false, true),
    BuiltinEntry::chat("@cf/deepseek-ai/deepseek-r1-distill-qwen-32b", true, false, true),
    BuiltinEntry::image("dall-e-2", Some(DEFAULT_IMAGE_MODEL)),
    BuiltinEntry::image("dall-e-3", Some(DEFAULT_IMAGE_MODEL)),
    BuiltinEntry::image("gpt-image-1", Some(DEFAULT_IMAGE_MODEL)),
    BuiltinEntry::image(DEFAULT_IMAGE_MODEL, None),
    BuiltinEntry::image("@cf/stabilityai/stable-diffusion-xl-base-1.0", None),
];
