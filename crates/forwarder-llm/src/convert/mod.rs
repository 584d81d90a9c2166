//! Conversion between internal canonical types and wire formats
//!
//! Each submodule handles one protocol. Backend replies always convert into
//! [`BackendReply`](crate::types::BackendReply) so provider quirks stop here.

pub mod openai;
pub mod responses;
pub mod workers_ai;

/// Generate a tool call id for backends that omit one
pub(crate) fn generate_call_id() -> String {
    format!("call_{}", uuid::Uuid::new_v4().simple())
}
