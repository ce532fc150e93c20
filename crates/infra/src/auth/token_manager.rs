//! Access token lifecycle
//!
//! Tokens live in two slots: the default slot (refresh-token grant) and a
//! map keyed by grantless scope (client-credentials grant). Refreshes are
//! single-flight per slot: concurrent refreshers queue on the slot's lock and
//! the ones arriving after a successful refresh reuse its result.

use std::collections::HashMap;
use std::sync::Arc;

use spapi_domain::{
    AccessToken, ClientOptions, GrantlessScope, Result, SpApiError, Timeouts, TokenExchangeBody,
    TokenResponse,
};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument};

use super::client::TokenEndpoint;
use super::credentials::CredentialStore;

type SlotKey = Option<GrantlessScope>;

pub struct TokenManager {
    endpoint: Arc<dyn TokenEndpoint>,
    credentials: Arc<CredentialStore>,
    auto_refresh: bool,
    grantless_only: bool,
    default_token: RwLock<Option<AccessToken>>,
    scoped_tokens: RwLock<HashMap<GrantlessScope, AccessToken>>,
    refresh_locks: parking_lot::Mutex<HashMap<SlotKey, Arc<Mutex<()>>>>,
}

impl TokenManager {
    pub fn new(
        endpoint: Arc<dyn TokenEndpoint>,
        credentials: Arc<CredentialStore>,
        options: &ClientOptions,
    ) -> Self {
        Self {
            endpoint,
            credentials,
            auto_refresh: options.auto_request_tokens,
            grantless_only: options.only_grantless_operations,
            default_token: RwLock::new(None),
            scoped_tokens: RwLock::new(HashMap::new()),
            refresh_locks: parking_lot::Mutex::new(HashMap::new()),
        }
    }

    /// Seed the default slot, e.g. with a configured access token.
    #[must_use]
    pub fn with_token(mut self, token: AccessToken) -> Self {
        *self.default_token.get_mut() = Some(token);
        self
    }

    /// Current token for the slot, if any.
    pub async fn token(&self, scope: Option<GrantlessScope>) -> Option<AccessToken> {
        match scope {
            None => self.default_token.read().await.clone(),
            Some(scope) => self.scoped_tokens.read().await.get(&scope).cloned(),
        }
    }

    pub async fn token_exists(&self, scope: Option<GrantlessScope>) -> bool {
        self.token(scope).await.is_some()
    }

    /// Store a caller-supplied token in the slot.
    pub async fn set_token(&self, scope: Option<GrantlessScope>, token: AccessToken) {
        match scope {
            None => *self.default_token.write().await = Some(token),
            Some(scope) => {
                self.scoped_tokens.write().await.insert(scope, token);
            }
        }
    }

    /// Make sure the slot holds a token, requesting one when allowed.
    ///
    /// # Errors
    /// - `NoAccessTokenPresent` when the slot is empty and automatic token
    ///   requests are disabled
    /// - any error from the token exchange
    pub async fn ensure_token(
        &self,
        scope: Option<GrantlessScope>,
        timeouts: &Timeouts,
    ) -> Result<AccessToken> {
        if let Some(token) = self.token(scope).await {
            return Ok(token);
        }
        if self.auto_refresh {
            return self.refresh_if_stale(scope, None, timeouts).await;
        }
        Err(SpApiError::NoAccessTokenPresent)
    }

    /// Request a new token for `scope` (a grantless scope literal) or for the
    /// default slot when `scope` is `None`.
    ///
    /// # Errors
    /// - `InvalidScope` for anything but the grantless scope literals
    /// - `NoScopeProvided` for a default refresh in grantless-only mode
    /// - `NoRefreshTokenPresent` when no refresh token is stored
    /// - `TokenExchange` / `JsonParse` from the token endpoint
    pub async fn refresh(&self, scope: Option<&str>, timeouts: &Timeouts) -> Result<AccessToken> {
        let scope = scope.map(GrantlessScope::parse).transpose()?;
        let lock = self.slot_lock(scope);
        let _guard = lock.lock().await;
        self.exchange_and_store(scope, timeouts).await
    }

    /// Refresh the slot unless another call chain already replaced `observed`.
    ///
    /// `observed` is the token the caller saw rejected (or `None` when the
    /// slot was empty). Waiters queued behind an in-flight refresh find a
    /// different token in the slot and return it without a second exchange.
    #[instrument(skip_all, fields(scope = scope.map(|s| s.as_str())))]
    pub async fn refresh_if_stale(
        &self,
        scope: Option<GrantlessScope>,
        observed: Option<&AccessToken>,
        timeouts: &Timeouts,
    ) -> Result<AccessToken> {
        let lock = self.slot_lock(scope);
        let _guard = lock.lock().await;

        if let Some(current) = self.token(scope).await {
            if observed != Some(&current) {
                debug!("token already refreshed by another caller");
                return Ok(current);
            }
        }
        self.exchange_and_store(scope, timeouts).await
    }

    /// Exchange an authorization code for a token pair.
    ///
    /// The stored tokens are left untouched.
    pub async fn exchange(&self, code: &str, timeouts: &Timeouts) -> Result<TokenResponse> {
        let credentials = self.credentials.current();
        let body = TokenExchangeBody::authorization_code(&credentials, code);
        self.endpoint.request_token(&body, timeouts).await
    }

    async fn exchange_and_store(
        &self,
        scope: Option<GrantlessScope>,
        timeouts: &Timeouts,
    ) -> Result<AccessToken> {
        let credentials = self.credentials.current();
        let body = match scope {
            Some(scope) => TokenExchangeBody::client_credentials(&credentials, scope),
            None if self.grantless_only => return Err(SpApiError::NoScopeProvided),
            None => {
                let refresh_token = credentials
                    .refresh_token
                    .as_deref()
                    .filter(|token| !token.trim().is_empty())
                    .ok_or(SpApiError::NoRefreshTokenPresent)?;
                TokenExchangeBody::refresh(&credentials, refresh_token)
            }
        };

        let response = self.endpoint.request_token(&body, timeouts).await?;
        let token = AccessToken::new(response.access_token);
        self.set_token(scope, token.clone()).await;
        info!(scope = scope.map(|s| s.as_str()), "access token refreshed");
        Ok(token)
    }

    fn slot_lock(&self, scope: SlotKey) -> Arc<Mutex<()>> {
        self.refresh_locks.lock().entry(scope).or_default().clone()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use parking_lot::Mutex as SyncMutex;
    use spapi_domain::{Credentials, GrantType};

    use super::*;

    /// Endpoint issuing numbered tokens and recording request bodies.
    #[derive(Default)]
    struct CountingEndpoint {
        issued: AtomicUsize,
        bodies: SyncMutex<Vec<TokenExchangeBody>>,
        delay: Duration,
    }

    #[async_trait]
    impl TokenEndpoint for CountingEndpoint {
        async fn request_token(
            &self,
            body: &TokenExchangeBody,
            _timeouts: &Timeouts,
        ) -> Result<TokenResponse> {
            self.bodies.lock().push(body.clone());
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(TokenResponse {
                access_token: format!("token-{n}"),
                refresh_token: None,
                token_type: Some("bearer".into()),
                expires_in: Some(3600),
            })
        }
    }

    fn manager_with(endpoint: Arc<CountingEndpoint>, options: ClientOptions) -> TokenManager {
        let credentials = Credentials::new("client", "secret").with_refresh_token("Atzr|refresh");
        TokenManager::new(endpoint, Arc::new(CredentialStore::new(credentials).unwrap()), &options)
    }

    fn manager(endpoint: Arc<CountingEndpoint>) -> TokenManager {
        manager_with(endpoint, ClientOptions::default())
    }

    #[tokio::test]
    async fn ensure_token_requests_a_default_token_once() {
        let endpoint = Arc::new(CountingEndpoint::default());
        let manager = manager(endpoint.clone());

        let first = manager.ensure_token(None, &Timeouts::default()).await.unwrap();
        let second = manager.ensure_token(None, &Timeouts::default()).await.unwrap();

        assert_eq!(first.as_str(), "token-1");
        assert_eq!(second, first);
        let bodies = endpoint.bodies.lock();
        assert_eq!(bodies.len(), 1);
        assert_eq!(bodies[0].grant_type, GrantType::RefreshToken);
        assert_eq!(bodies[0].refresh_token.as_deref(), Some("Atzr|refresh"));
    }

    #[tokio::test]
    async fn ensure_token_without_auto_refresh_fails() {
        let endpoint = Arc::new(CountingEndpoint::default());
        let options = ClientOptions { auto_request_tokens: false, ..ClientOptions::default() };
        let manager = manager_with(endpoint.clone(), options);

        let err = manager.ensure_token(None, &Timeouts::default()).await.unwrap_err();
        assert_eq!(err, SpApiError::NoAccessTokenPresent);
        assert_eq!(endpoint.issued.load(Ordering::SeqCst), 0);

        manager.set_token(None, AccessToken::new("supplied")).await;
        assert_eq!(manager.ensure_token(None, &Timeouts::default()).await.unwrap().as_str(), "supplied");
    }

    #[tokio::test]
    async fn scoped_refresh_uses_client_credentials() {
        let endpoint = Arc::new(CountingEndpoint::default());
        let manager = manager(endpoint.clone());

        manager
            .refresh(Some("sellingpartnerapi::notifications"), &Timeouts::default())
            .await
            .unwrap();

        assert!(manager.token_exists(Some(GrantlessScope::Notifications)).await);
        assert!(!manager.token_exists(None).await);
        let body = endpoint.bodies.lock()[0].clone();
        assert_eq!(body.grant_type, GrantType::ClientCredentials);
        assert_eq!(body.scope.as_deref(), Some("sellingpartnerapi::notifications"));
        assert_eq!(body.refresh_token, None);
    }

    #[tokio::test]
    async fn unknown_scope_is_rejected_before_any_exchange() {
        let endpoint = Arc::new(CountingEndpoint::default());
        let manager = manager(endpoint.clone());

        let err = manager.refresh(Some("sellingpartnerapi::orders"), &Timeouts::default()).await;
        assert_eq!(err.unwrap_err(), SpApiError::InvalidScope("sellingpartnerapi::orders".into()));
        assert_eq!(endpoint.issued.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn grantless_only_default_refresh_needs_a_scope() {
        let endpoint = Arc::new(CountingEndpoint::default());
        let options = ClientOptions { only_grantless_operations: true, ..ClientOptions::default() };
        let manager = manager_with(endpoint, options);

        let err = manager.refresh(None, &Timeouts::default()).await.unwrap_err();
        assert_eq!(err, SpApiError::NoScopeProvided);
    }

    #[tokio::test]
    async fn missing_refresh_token_is_reported() {
        let endpoint = Arc::new(CountingEndpoint::default());
        let store = CredentialStore::new(Credentials::new("client", "secret")).unwrap();
        let manager = TokenManager::new(endpoint, Arc::new(store), &ClientOptions::default());

        let err = manager.ensure_token(None, &Timeouts::default()).await.unwrap_err();
        assert_eq!(err, SpApiError::NoRefreshTokenPresent);
    }

    #[tokio::test]
    async fn concurrent_stale_refreshes_share_one_exchange() {
        let endpoint =
            Arc::new(CountingEndpoint { delay: Duration::from_millis(50), ..Default::default() });
        let manager = Arc::new(manager(endpoint.clone()));
        let expired = AccessToken::new("expired");
        manager.set_token(None, expired.clone()).await;

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let manager = manager.clone();
                let expired = expired.clone();
                tokio::spawn(async move {
                    manager.refresh_if_stale(None, Some(&expired), &Timeouts::default()).await
                })
            })
            .collect();

        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap().as_str(), "token-1");
        }
        assert_eq!(endpoint.issued.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn authorization_code_exchange_leaves_slots_alone() {
        let endpoint = Arc::new(CountingEndpoint::default());
        let manager = manager(endpoint.clone());

        let response = manager.exchange("ANDGXVQ", &Timeouts::default()).await.unwrap();

        assert_eq!(response.access_token, "token-1");
        assert!(!manager.token_exists(None).await);
        let body = endpoint.bodies.lock()[0].clone();
        assert_eq!(body.grant_type, GrantType::AuthorizationCode);
        assert_eq!(body.code.as_deref(), Some("ANDGXVQ"));
    }
}
