//! Selling partner API access
//!
//! - [`RequestOrchestrator`]: resolve, authorize, dispatch and recover one call
//! - [`SellingPartner`]: the client handle tying calls, reports and documents
//!   together

pub mod client;
pub mod orchestrator;

pub use client::{SellingPartner, SellingPartnerBuilder};
pub use orchestrator::RequestOrchestrator;
