//! Authorization: credentials, token exchange and token caching

pub mod client;
pub mod credentials;
pub mod token_manager;

pub use client::{AuthClient, TokenEndpoint};
pub use credentials::CredentialStore;
pub use token_manager::TokenManager;
