use forwarder_config::AuthConfig;
use secrecy::ExposeSecret;
use sha2::{Digest, Sha256};

use crate::AuthError;

/// Decides whether a bearer credential may use the gateway
pub trait Authorizer: Send + Sync {
    /// Whether `token` is an accepted credential
    fn is_authorized(&self, token: &str) -> bool;

    /// Check an optional credential, classifying the failure
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingToken` when no token was presented and
    /// `AuthError::InvalidKey` when it was rejected
    fn check(&self, token: Option<&str>) -> Result<(), AuthError> {
        let token = token.ok_or(AuthError::MissingToken)?;

        if self.is_authorized(token) {
            Ok(())
        } else {
            Err(AuthError::InvalidKey)
        }
    }
}

/// Authorizer backed by a fixed list of API keys
///
/// Only SHA-256 digests of the keys are retained.
pub struct StaticKeyAuthorizer {
    enabled: bool,
    digests: Vec<[u8; 32]>,
}

impl StaticKeyAuthorizer {
    /// Create an authorizer accepting exactly the given keys
    pub fn new<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let digests = keys
            .into_iter()
            .filter(|k| !k.as_ref().trim().is_empty())
            .map(|k| digest(k.as_ref()))
            .collect();

        Self { enabled: true, digests }
    }

    /// Authorizer that accepts every request
    pub const fn disabled() -> Self {
        Self {
            enabled: false,
            digests: Vec::new(),
        }
    }

    /// Build from `[server.auth]`; a missing or disabled section allows everything
    pub fn from_config(config: Option<&AuthConfig>) -> Self {
        match config {
            Some(auth) if auth.enabled => {
                let authorizer = Self::new(auth.api_keys.iter().map(ExposeSecret::expose_secret));
                tracing::debug!(keys = authorizer.digests.len(), "static key authorizer configured");
                authorizer
            }
            _ => Self::disabled(),
        }
    }

    /// Whether requests are checked at all
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl Authorizer for StaticKeyAuthorizer {
    fn is_authorized(&self, token: &str) -> bool {
        if !self.enabled {
            return true;
        }

        let presented = digest(token);
        self.digests.iter().any(|d| *d == presented)
    }

    fn check(&self, token: Option<&str>) -> Result<(), AuthError> {
        if !self.enabled {
            return Ok(());
        }

        let token = token.ok_or(AuthError::MissingToken)?;

        if self.is_authorized(token) {
            Ok(())
        } else {
            Err(AuthError::InvalidKey)
        }
    }
}

fn digest(input: &str) -> [u8; 32] {
    Sha256::digest(input.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use forwarder_core::HttpError;

    use super::*;

    #[test]
    fn accepts_configured_keys_only() {
        let auth = StaticKeyAuthorizer::new(["sk-one", "sk-two"]);

        assert!(auth.is_authorized("sk-one"));
        assert!(auth.is_authorized("sk-two"));
        assert!(!auth.is_authorized("sk-three"));
        assert!(!auth.is_authorized(""));
    }

    #[test]
    fn blank_keys_are_ignored() {
        let auth = StaticKeyAuthorizer::new(["", "  "]);

        assert!(!auth.is_authorized(""));
        assert!(!auth.is_authorized("  "));
    }

    #[test]
    fn disabled_accepts_everything() {
        let auth = StaticKeyAuthorizer::from_config(None);

        assert!(!auth.is_enabled());
        assert!(auth.is_authorized("anything"));
        assert!(auth.check(None).is_ok());
    }

    #[test]
    fn check_classifies_failures() {
        let auth = StaticKeyAuthorizer::new(["sk-one"]);

        assert!(matches!(auth.check(None), Err(AuthError::MissingToken)));
        assert!(matches!(auth.check(Some("nope")), Err(AuthError::InvalidKey)));
        assert!(auth.check(Some("sk-one")).is_ok());
    }

    #[test]
    fn errors_render_as_authentication_error() {
        let body = AuthError::InvalidKey.to_body();

        assert_eq!(AuthError::InvalidKey.status_code(), http::StatusCode::UNAUTHORIZED);
        assert_eq!(body.error.error_type, "authentication_error");
    }
}
