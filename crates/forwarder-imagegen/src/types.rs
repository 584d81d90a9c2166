use serde::{Deserialize, Serialize};

use crate::error::{ImageGenError, Result};

/// Upper bound on images per request
pub const MAX_IMAGES: u32 = 10;

/// Image generation request following `OpenAI` API format
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImageRequest {
    /// Text description of the desired image
    #[serde(default)]
    pub prompt: String,
    /// Model identifier (e.g. "dall-e-3", "gpt-image-1")
    #[serde(default = "default_model")]
    pub model: String,
    /// Number of images to generate
    #[serde(default = "default_n")]
    pub n: u32,
    /// Size of generated images (e.g. "1024x1024")
    #[serde(default = "default_size")]
    pub size: String,
    /// Quality of generated images ("standard" or "hd")
    #[serde(default = "default_quality")]
    pub quality: String,
    /// Response format ("url" or "`b64_json`")
    #[serde(default = "default_response_format")]
    pub response_format: String,
    /// Unique identifier for the end user (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

fn default_model() -> String {
    "dall-e-2".to_owned()
}

const fn default_n() -> u32 {
    1
}

fn default_size() -> String {
    "1024x1024".to_owned()
}

fn default_quality() -> String {
    "standard".to_owned()
}

fn default_response_format() -> String {
    "url".to_owned()
}

/// Output encoding the client asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    /// `data[i].url`
    Url,
    /// `data[i].b64_json`
    B64Json,
}

impl ResponseFormat {
    /// Wire spelling
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Url => "url",
            Self::B64Json => "b64_json",
        }
    }
}

/// Image dimensions parsed from `WxH`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageRequest {
    /// Check parameters and parse the typed fields
    ///
    /// # Errors
    ///
    /// Returns `ImageGenError::InvalidRequest` for an empty prompt, `n`
    /// outside `1..=10`, a malformed size, or an unknown response format
    pub fn validate(&self) -> Result<(ImageSize, ResponseFormat)> {
        if self.prompt.trim().is_empty() {
            return Err(ImageGenError::InvalidRequest("prompt is required".to_owned()));
        }

        if self.model.trim().is_empty() {
            return Err(ImageGenError::InvalidRequest("model is required".to_owned()));
        }

        if !(1..=MAX_IMAGES).contains(&self.n) {
            return Err(ImageGenError::InvalidRequest(format!(
                "n must be between 1 and {MAX_IMAGES}"
            )));
        }

        Ok((parse_size(&self.size)?, parse_response_format(&self.response_format)?))
    }
}

fn parse_size(size: &str) -> Result<ImageSize> {
    let invalid = || ImageGenError::InvalidRequest(format!("invalid size '{size}', expected WIDTHxHEIGHT"));

    let (width, height) = size.split_once('x').ok_or_else(invalid)?;
    let width: u32 = width.trim().parse().map_err(|_| invalid())?;
    let height: u32 = height.trim().parse().map_err(|_| invalid())?;

    if width == 0 || height == 0 {
        return Err(invalid());
    }

    Ok(ImageSize { width, height })
}

fn parse_response_format(format: &str) -> Result<ResponseFormat> {
    match format {
        "url" => Ok(ResponseFormat::Url),
        "b64_json" => Ok(ResponseFormat::B64Json),
        other => Err(ImageGenError::InvalidRequest(format!(
            "response_format must be 'url' or 'b64_json', got '{other}'"
        ))),
    }
}

/// Single image entry in the response
///
/// Exactly one of `url` and `b64_json` is set, matching the requested
/// format.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ImageData {
    /// URL of the generated image (when `response_format` is "url")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Base64-encoded image data (when `response_format` is "`b64_json`")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub b64_json: Option<String>,
    /// Revised prompt used by the model (if applicable)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revised_prompt: Option<String>,
}

/// Image generation response following `OpenAI` API format
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImageResponse {
    /// Unix timestamp of when the response was created
    pub created: u64,
    /// Client-facing model alias
    pub model: String,
    /// Array of generated image results
    pub data: Vec<ImageData>,
}
