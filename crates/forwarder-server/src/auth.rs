use std::sync::Arc;

use axum::Json;
use axum::extract::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use forwarder_auth::Authorizer;
use forwarder_core::{HttpError, bearer_token};
use http::Method;

/// Reject requests without an accepted bearer credential
///
/// Public paths and CORS preflight requests pass through untouched. A
/// rejection is rendered as an `OpenAI` error envelope before any handler
/// runs.
pub async fn auth_middleware(
    authorizer: Arc<dyn Authorizer>,
    public_paths: Arc<[String]>,
    request: Request,
    next: Next,
) -> Response {
    if request.method() == Method::OPTIONS || is_public(&public_paths, request.uri().path()) {
        return next.run(request).await;
    }

    let outcome = authorizer.check(bearer_token(request.headers()));

    match outcome {
        Ok(()) => next.run(request).await,
        Err(e) => {
            tracing::warn!(error = %e, path = %request.uri().path(), "request rejected by auth gate");
            (e.status_code(), Json(e.to_body())).into_response()
        }
    }
}

/// Exact match, or a match on whole path segments below a public path
fn is_public(public_paths: &[String], path: &str) -> bool {
    public_paths.iter().any(|p| {
        path.strip_prefix(p.as_str())
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    })
}
