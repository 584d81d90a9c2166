mod authorizer;
mod error;

pub use authorizer::{Authorizer, StaticKeyAuthorizer};
pub use error::AuthError;
