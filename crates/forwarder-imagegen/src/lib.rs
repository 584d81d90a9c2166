//! Image Adapter: `POST /v1/images/generations`
//!
//! Maps `OpenAI` image aliases onto backend image models, forwards the
//! prompt and parameters, and normalizes whatever the backend returned
//! into `url` or `b64_json` entries.

#![allow(
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_const_for_fn,
    clippy::module_name_repetitions
)]

mod error;
mod normalize;
mod provider;
mod server;
mod types;

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::{Json, Router, extract::State, routing::post};
use forwarder_core::RequestContext;
use forwarder_registry::CapabilityRegistry;

pub use error::{ImageGenError, Result};
pub use types::{ImageData, ImageRequest, ImageResponse, ImageSize, ResponseFormat};

pub use server::Server;
use server::ImageGenServerBuilder;

/// Build the image generation server from configuration
///
/// # Errors
///
/// Returns an error if a provider fails to initialize
pub fn build_server(
    config: &forwarder_config::Config,
    registry: Arc<CapabilityRegistry>,
) -> anyhow::Result<Arc<Server>> {
    let server = Arc::new(
        ImageGenServerBuilder::new(config, registry)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to initialize image generation server: {e}"))?,
    );
    Ok(server)
}

/// Create the endpoint router for image generation
pub fn endpoint_router() -> Router<Arc<Server>> {
    Router::new().route("/v1/images/generations", post(generate))
}

/// Handle image generation requests
async fn generate(
    State(server): State<Arc<Server>>,
    axum::Extension(context): axum::Extension<RequestContext>,
    payload: std::result::Result<Json<ImageRequest>, JsonRejection>,
) -> Result<Json<ImageResponse>> {
    let Json(request) = payload.map_err(|rejection| ImageGenError::InvalidRequest(rejection.body_text()))?;

    tracing::debug!(model = %request.model, "image generation handler called");

    let response = server.generate(&request, &context).await?;

    tracing::debug!(count = response.data.len(), "image generation complete");

    Ok(Json(response))
}
