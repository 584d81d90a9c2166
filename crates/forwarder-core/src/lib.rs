//! Shared primitives for the forwarder crates
//!
//! Holds the request context handed to backend providers and the
//! error-to-HTTP contract every domain error implements.

mod context;
mod error;

pub use context::{REQUEST_ID_HEADER, RequestContext, bearer_token};
pub use error::{ErrorBody, ErrorDetail, HttpError};
