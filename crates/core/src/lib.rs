//! # SpApi Core
//!
//! Pure orchestration logic - no network, filesystem or clock access.
//!
//! This crate contains:
//! - The endpoint registry and its built-in operation catalog
//! - Version resolution with fallback to older versions
//! - Response classification and throttle delay computation
//! - The report polling state machine
//! - Document codecs (charset, gzip, XML/TSV/JSON transcoding, error bodies)
//! - Port interfaces (traits) implemented by `spapi-infra`
//!
//! ## Architecture Principles
//! - Only depends on `spapi-domain`
//! - All I/O goes through [`ports`]
//! - Pure, testable logic

pub mod classify;
pub mod document;
pub mod ports;
pub mod registry;
pub mod report;
pub mod throttle;
pub mod version;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use classify::{classify_response, Outcome};
pub use ports::{ApiCaller, Sleeper, TokioSleeper};
pub use registry::{EndpointRegistry, OperationBuilder, OperationTemplate};
pub use report::ReportPoller;
pub use throttle::restore_delay;
pub use version::VersionResolver;
