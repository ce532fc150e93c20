//! # SpApi Domain
//!
//! Domain types and models for the request orchestration client.
//!
//! This crate contains:
//! - Request, response, token, report and document types
//! - Error types and the `Result` alias
//! - Configuration structures
//! - Constants and error-code normalization
//!
//! ## Architecture
//! - No dependencies on other workspace crates
//! - Only external dependencies allowed
//! - Pure data structures, no I/O

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;
pub mod utils;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
pub use utils::error_code::normalize_error_code;
