//! Wire format types for the client-facing and backend API protocols
//!
//! Pure serde structs used only for (de)serialization at the boundary.

pub mod openai;
pub mod responses;
pub mod workers_ai;
