//! Mapping backend images onto the requested response format
//!
//! The response carries `url` or `b64_json`, never both, whatever shape
//! the backend produced.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::Client;

use crate::error::{ImageGenError, Result};
use crate::provider::{GeneratedImage, RawImage};
use crate::types::{ImageData, ResponseFormat};

/// Convert one backend image into a response entry
///
/// A hosted URL is downloaded only when base64 output was requested.
pub(crate) async fn to_image_data(generated: GeneratedImage, format: ResponseFormat, client: &Client) -> Result<ImageData> {
    let encoded = match (generated.image, format) {
        (RawImage::Url(url), ResponseFormat::Url) => url,
        (RawImage::Url(url), ResponseFormat::B64Json) => match data_url_payload(&url) {
            Some(payload) => payload.to_owned(),
            None => STANDARD.encode(download(client, &url).await?),
        },
        (RawImage::Base64(b64), ResponseFormat::Url) => data_url(sniff_base64_mime(&b64), &b64),
        (RawImage::Base64(b64), ResponseFormat::B64Json) => b64,
        (RawImage::Bytes(bytes), ResponseFormat::Url) => data_url(sniff_mime(&bytes), &STANDARD.encode(&bytes)),
        (RawImage::Bytes(bytes), ResponseFormat::B64Json) => STANDARD.encode(&bytes),
    };

    let (url, b64_json) = match format {
        ResponseFormat::Url => (Some(encoded), None),
        ResponseFormat::B64Json => (None, Some(encoded)),
    };

    Ok(ImageData {
        url,
        b64_json,
        revised_prompt: generated.revised_prompt,
    })
}

fn data_url(mime: &str, b64: &str) -> String {
    format!("data:{mime};base64,{b64}")
}

/// Base64 payload of a `data:...;base64,` URL
fn data_url_payload(url: &str) -> Option<&str> {
    url.strip_prefix("data:")?.split_once(";base64,").map(|(_, payload)| payload)
}

fn sniff_mime(bytes: &[u8]) -> &'static str {
    match bytes {
        [0xFF, 0xD8, 0xFF, ..] => "image/jpeg",
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => "image/webp",
        _ => "image/png",
    }
}

fn sniff_base64_mime(b64: &str) -> &'static str {
    if b64.starts_with("/9j/") {
        "image/jpeg"
    } else if b64.starts_with("UklGR") {
        "image/webp"
    } else {
        "image/png"
    }
}

async fn download(client: &Client, url: &str) -> Result<Vec<u8>> {
    tracing::debug!(url = %url, "downloading generated image for base64 output");

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| ImageGenError::ConnectionError(format!("failed to download generated image: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(ImageGenError::ProviderApiError {
            status: status.as_u16(),
            message: format!("failed to download generated image: {status}"),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| ImageGenError::ConnectionError(format!("failed to download generated image: {e}")))?;

    Ok(bytes.to_vec())
}
