use forwarder_core::HttpError;
use http::StatusCode;

/// Authentication errors
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No bearer credential on the request
    #[error("missing bearer token")]
    MissingToken,

    /// Credential did not match any configured key
    #[error("invalid API key")]
    InvalidKey,
}

impl HttpError for AuthError {
    fn status_code(&self) -> StatusCode {
        StatusCode::UNAUTHORIZED
    }

    fn error_type(&self) -> &str {
        "authentication_error"
    }

    fn client_message(&self) -> String {
        match self {
            Self::MissingToken => {
                "You didn't provide an API key. Provide it as a bearer token in the Authorization header".to_owned()
            }
            Self::InvalidKey => "Incorrect API key provided".to_owned(),
        }
    }
}
