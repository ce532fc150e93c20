//! Authorization types: app credentials, tokens and the LWA wire format

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{SCOPE_CLIENT_CREDENTIAL_ROTATION, SCOPE_NOTIFICATIONS};
use crate::errors::{Result, SpApiError};
use crate::impl_wire_conversions;

/// App client credentials plus the seller's refresh token.
///
/// Replaceable wholesale at runtime; `Debug` never prints secrets.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub app_client_id: String,
    pub app_client_secret: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl Credentials {
    pub fn new(app_client_id: impl Into<String>, app_client_secret: impl Into<String>) -> Self {
        Self {
            app_client_id: app_client_id.into(),
            app_client_secret: app_client_secret.into(),
            refresh_token: None,
        }
    }

    #[must_use]
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    /// Fails with `MissingCredentials` naming the first empty field.
    pub fn validate(&self) -> Result<()> {
        if self.app_client_id.trim().is_empty() {
            return Err(SpApiError::MissingCredentials("app_client_id".into()));
        }
        if self.app_client_secret.trim().is_empty() {
            return Err(SpApiError::MissingCredentials("app_client_secret".into()));
        }
        Ok(())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("app_client_id", &self.app_client_id)
            .field("app_client_secret", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Bearer token sent in the `x-amz-access-token` header.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix: String = self.0.chars().take(6).collect();
        write!(f, "AccessToken({prefix}...)")
    }
}

impl From<String> for AccessToken {
    fn from(token: String) -> Self {
        Self(token)
    }
}

impl From<&str> for AccessToken {
    fn from(token: &str) -> Self {
        Self(token.to_string())
    }
}

/// Scopes for operations callable without seller authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GrantlessScope {
    Notifications,
    ClientCredentialRotation,
}

impl_wire_conversions!(GrantlessScope {
    Notifications => SCOPE_NOTIFICATIONS,
    ClientCredentialRotation => SCOPE_CLIENT_CREDENTIAL_ROTATION,
});

impl GrantlessScope {
    /// Parse a scope string; only the two grantless literals are accepted.
    pub fn parse(scope: &str) -> Result<Self> {
        scope.parse().map_err(|_| SpApiError::InvalidScope(scope.to_string()))
    }
}

/// OAuth2 grant types used against the token endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
    RefreshToken,
    ClientCredentials,
    AuthorizationCode,
}

/// JSON body posted to the token endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenExchangeBody {
    pub grant_type: GrantType,
    pub client_id: String,
    pub client_secret: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl TokenExchangeBody {
    pub fn refresh(credentials: &Credentials, refresh_token: impl Into<String>) -> Self {
        Self::with_grant(GrantType::RefreshToken, credentials)
            .tap(|body| body.refresh_token = Some(refresh_token.into()))
    }

    pub fn client_credentials(credentials: &Credentials, scope: GrantlessScope) -> Self {
        Self::with_grant(GrantType::ClientCredentials, credentials)
            .tap(|body| body.scope = Some(scope.as_str().to_string()))
    }

    pub fn authorization_code(credentials: &Credentials, code: impl Into<String>) -> Self {
        Self::with_grant(GrantType::AuthorizationCode, credentials)
            .tap(|body| body.code = Some(code.into()))
    }

    fn with_grant(grant_type: GrantType, credentials: &Credentials) -> Self {
        Self {
            grant_type,
            client_id: credentials.app_client_id.clone(),
            client_secret: credentials.app_client_secret.clone(),
            refresh_token: None,
            scope: None,
            code: None,
        }
    }

    fn tap(mut self, f: impl FnOnce(&mut Self)) -> Self {
        f(&mut self);
        self
    }
}

/// Successful token endpoint response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
}

/// Error shape returned by the token endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenErrorResponse {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl From<TokenErrorResponse> for SpApiError {
    fn from(err: TokenErrorResponse) -> Self {
        Self::TokenExchange {
            code: err.error,
            description: err.error_description.unwrap_or_default(),
        }
    }
}
