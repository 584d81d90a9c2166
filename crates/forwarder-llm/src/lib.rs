//! Protocol normalization for chat completions and the Responses API
//!
//! Requests arrive in the `OpenAI` shape, are gated against the target
//! model's capabilities, sent to a backend provider, and the backend's
//! reply (complete or streamed) is rewritten into a conformant `OpenAI`
//! envelope regardless of what the backend returned or omitted.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

pub mod convert;
pub mod error;
#[cfg(feature = "http")]
mod handler;
pub mod normalize;
pub mod protocol;
pub mod provider;
pub mod responses;
mod state;
pub mod stream;
pub mod transform;
pub mod types;

pub use error::LlmError;
#[cfg(feature = "http")]
pub use handler::llm_router;
pub use provider::{EventStream, Provider, RawReply};
pub use state::{ChatReply, LlmState, Route};
pub use types::{BackendReply, CompletionRequest, CompletionResponse, StreamEvent};
