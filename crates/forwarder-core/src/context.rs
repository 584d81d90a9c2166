use secrecy::SecretString;

/// Runtime context for provider requests
///
/// Shared across chat, responses, and image request flows
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// HTTP request parts (method, URI, headers, extensions)
    pub parts: http::request::Parts,
    /// Bearer credential presented by the client, if any
    pub api_key: Option<SecretString>,
}

impl RequestContext {
    /// Create a context from inbound request parts
    pub fn from_parts(parts: http::request::Parts) -> Self {
        let api_key = bearer_token(&parts.headers).map(|token| SecretString::from(token.to_owned()));
        Self { parts, api_key }
    }

    /// Create a minimal context for non-HTTP use
    ///
    /// Contains empty headers and no API key
    #[allow(clippy::missing_panics_doc)]
    pub fn empty() -> Self {
        // Constant method and URI cannot fail to build
        let (parts, ()) = http::Request::builder()
            .method(http::Method::GET)
            .uri("/")
            .body(())
            .expect("valid minimal request")
            .into_parts();

        Self { parts, api_key: None }
    }

    /// Access request headers
    pub fn headers(&self) -> &http::HeaderMap {
        &self.parts.headers
    }

    /// Client-supplied `x-request-id`, forwarded to backends for correlation
    pub fn request_id(&self) -> Option<&str> {
        self.parts
            .headers
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
    }
}

/// Header carrying the client's request correlation id
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Extract the token from an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &http::HeaderMap) -> Option<&str> {
    headers
        .get(http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer ").or_else(|| v.strip_prefix("bearer ")))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
