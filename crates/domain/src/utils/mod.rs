//! Small pure helpers shared by the domain types

pub mod error_code;
pub mod serde;
