//! # SpApi Infrastructure
//!
//! Infrastructure implementations of the core ports.
//!
//! This crate contains:
//! - The reqwest-backed HTTP client with per-call time budgets
//! - Token exchange, credential storage and single-flight token caching
//! - The request orchestrator and the `SellingPartner` client facade
//! - Pre-signed document transfers (buffered and streamed)
//! - Configuration loading and tracing setup
//!
//! ## Architecture
//! - Implements traits defined in `spapi-core`
//! - Depends on `spapi-domain` and `spapi-core`
//! - Contains all "impure" code (network, filesystem, timers)

pub mod api;
pub mod auth;
pub mod config;
pub mod errors;
pub mod http;
pub mod observability;
pub mod transfer;

// Re-export commonly used items
pub use api::{RequestOrchestrator, SellingPartner, SellingPartnerBuilder};
pub use auth::{AuthClient, CredentialStore, TokenEndpoint, TokenManager};
pub use errors::InfraError;
pub use http::{HttpClient, HttpClientBuilder, HttpResponse, StreamingResponse};
pub use observability::init_tracing;
pub use transfer::{DocumentStream, DocumentTransfer};
