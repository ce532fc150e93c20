//! In-memory credential storage

use std::sync::Arc;

use parking_lot::RwLock;
use spapi_domain::{Credentials, Result};

/// Holds the app credentials and refresh token used for token exchanges.
///
/// Readers get a snapshot; replacing the credentials never affects an
/// exchange that already took its snapshot.
#[derive(Debug)]
pub struct CredentialStore {
    inner: RwLock<Arc<Credentials>>,
}

impl CredentialStore {
    /// # Errors
    /// `MissingCredentials` when the client id or secret is empty.
    pub fn new(credentials: Credentials) -> Result<Self> {
        credentials.validate()?;
        Ok(Self { inner: RwLock::new(Arc::new(credentials)) })
    }

    pub fn current(&self) -> Arc<Credentials> {
        self.inner.read().clone()
    }

    /// Swap in new credentials after validating them.
    pub fn replace(&self, credentials: Credentials) -> Result<()> {
        credentials.validate()?;
        *self.inner.write() = Arc::new(credentials);
        Ok(())
    }
}
