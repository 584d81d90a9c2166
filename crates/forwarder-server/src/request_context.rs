use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use forwarder_core::RequestContext;

/// Middleware that attaches a `RequestContext` to the incoming request
///
/// Captures the HTTP parts and the bearer credential so handlers can pass
/// them on to backend providers
pub async fn request_context_middleware(request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();

    let context = RequestContext::from_parts(parts.clone());

    let mut request = Request::from_parts(parts, body);
    request.extensions_mut().insert(context);

    next.run(request).await
}
