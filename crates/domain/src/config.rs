//! Client configuration
//!
//! Plain serde structures; loading from the environment or files lives in
//! `spapi-infra::config::loader`, and version pins are checked against the
//! endpoint registry in `spapi-core`.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::default_user_agent;
use crate::errors::{Result, SpApiError};
use crate::impl_wire_conversions;
use crate::types::{Credentials, Timeouts};

/// Selling partner API region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    NorthAmerica,
    Europe,
    FarEast,
}

impl_wire_conversions!(Region {
    NorthAmerica => "na",
    Europe => "eu",
    FarEast => "fe",
});

impl Region {
    /// Parse a region selector, failing with `InvalidRegion`.
    pub fn parse(region: &str) -> Result<Self> {
        region.trim().parse().map_err(|_| SpApiError::InvalidRegion(region.to_string()))
    }

    /// API host for this region.
    pub fn host(self, sandbox: bool) -> String {
        if sandbox {
            format!("sandbox.sellingpartnerapi-{}.amazon.com", self.as_str())
        } else {
            format!("sellingpartnerapi-{}.amazon.com", self.as_str())
        }
    }

    pub fn base_url(self, sandbox: bool) -> String {
        format!("https://{}", self.host(sandbox))
    }
}

/// Delay growth between consecutive throttle retries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// Always wait the computed restore delay
    Fixed,
    /// Multiply the restore delay per attempt, capped at `max_delay_ms`
    Exponential { multiplier: f64, max_delay_ms: u64 },
}

impl Default for BackoffStrategy {
    fn default() -> Self {
        Self::Fixed
    }
}

impl BackoffStrategy {
    /// Delay before retry `attempt` (1-based) given the base restore delay.
    pub fn delay(&self, base: Duration, attempt: u32) -> Duration {
        match *self {
            Self::Fixed => base,
            Self::Exponential { multiplier, max_delay_ms } => {
                let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
                let factor = multiplier.max(1.0).powi(exponent);
                let cap = Duration::from_millis(max_delay_ms);
                let scaled = base.as_secs_f64() * factor;
                if !scaled.is_finite() || scaled >= cap.as_secs_f64() {
                    cap.max(base)
                } else {
                    Duration::from_secs_f64(scaled)
                }
            }
        }
    }
}

/// Caps on automatic recovery. `None` means unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    #[serde(default)]
    pub max_throttle_retries: Option<u32>,
    #[serde(default)]
    pub max_token_refreshes: Option<u32>,
    #[serde(default)]
    pub backoff: BackoffStrategy,
}

impl RetryPolicy {
    pub fn allows_throttle_retry(&self, performed: u32) -> bool {
        self.max_throttle_retries.map_or(true, |max| performed < max)
    }

    pub fn allows_token_refresh(&self, performed: u32) -> bool {
        self.max_token_refreshes.map_or(true, |max| performed < max)
    }
}

/// Feature toggles and transport defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientOptions {
    /// Request tokens automatically when missing or expired
    pub auto_request_tokens: bool,
    /// Sleep and retry on 429 `QuotaExceeded`
    pub auto_request_throttled: bool,
    /// Search older versions for operations missing in the pinned one
    pub version_fallback: bool,
    pub use_sandbox: bool,
    /// Restrict the client to grantless (scoped) operations
    pub only_grantless_operations: bool,
    /// Log request/response summaries at info level
    pub debug_log: bool,
    pub user_agent: String,
    pub timeouts: Timeouts,
    pub retry: RetryPolicy,
    /// Transport-level attempts per dispatch (connection errors only)
    pub transport_attempts: u32,
    /// Overrides the regional API host
    pub api_base_url: Option<String>,
    /// Overrides the token endpoint
    pub auth_url: Option<String>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            auto_request_tokens: true,
            auto_request_throttled: true,
            version_fallback: true,
            use_sandbox: false,
            only_grantless_operations: false,
            debug_log: false,
            user_agent: default_user_agent(),
            timeouts: Timeouts::default(),
            retry: RetryPolicy::default(),
            transport_attempts: 1,
            api_base_url: None,
            auth_url: None,
        }
    }
}

/// Application credentials as they appear in configuration files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppCredentials {
    #[serde(default)]
    pub app_client_id: String,
    #[serde(default)]
    pub app_client_secret: String,
}

/// Top-level client configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub region: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Initial access token, used until the first refresh
    #[serde(default)]
    pub access_token: Option<String>,
    /// Per-endpoint version pins
    #[serde(default)]
    pub endpoints_versions: BTreeMap<String, String>,
    #[serde(default)]
    pub credentials: AppCredentials,
    #[serde(default)]
    pub options: ClientOptions,
}

impl ClientConfig {
    pub fn new(region: impl Into<String>, credentials: AppCredentials) -> Self {
        Self {
            region: region.into(),
            refresh_token: None,
            access_token: None,
            endpoints_versions: BTreeMap::new(),
            credentials,
            options: ClientOptions::default(),
        }
    }

    #[must_use]
    pub fn refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    #[must_use]
    pub fn pin_version(mut self, endpoint: impl Into<String>, version: impl Into<String>) -> Self {
        self.endpoints_versions.insert(endpoint.into(), version.into());
        self
    }

    #[must_use]
    pub fn options(mut self, options: ClientOptions) -> Self {
        self.options = options;
        self
    }

    /// Validate everything that does not need the endpoint registry.
    ///
    /// # Errors
    /// - `InvalidRegion` for an unknown region
    /// - `MissingCredentials` when app credentials are empty
    /// - `NoRefreshTokenPresent` unless grantless-only mode is enabled
    pub fn validate(&self) -> Result<Region> {
        let region = Region::parse(&self.region)?;
        self.app_credentials().validate()?;
        let has_refresh_token =
            self.refresh_token.as_deref().is_some_and(|token| !token.trim().is_empty());
        if !has_refresh_token && !self.options.only_grantless_operations {
            return Err(SpApiError::NoRefreshTokenPresent);
        }
        Ok(region)
    }

    /// Credentials in the shape held by the credential store.
    pub fn app_credentials(&self) -> Credentials {
        Credentials {
            app_client_id: self.credentials.app_client_id.clone(),
            app_client_secret: self.credentials.app_client_secret.clone(),
            refresh_token: self.refresh_token.clone(),
        }
    }

    /// API base URL honoring the override, region and sandbox flag.
    pub fn api_base_url(&self, region: Region) -> String {
        self.options
            .api_base_url
            .clone()
            .unwrap_or_else(|| region.base_url(self.options.use_sandbox))
    }
}
