//! Client constants
//!
//! Centralized location for wire-level literals and defaults.

// Authorization
pub const AUTH_ENDPOINT: &str = "https://api.amazon.com/auth/o2/token";
pub const SCOPE_NOTIFICATIONS: &str = "sellingpartnerapi::notifications";
pub const SCOPE_CLIENT_CREDENTIAL_ROTATION: &str = "sellingpartnerapi::client_credential:rotation";
pub const GRANTLESS_SCOPES: [&str; 2] = [SCOPE_NOTIFICATIONS, SCOPE_CLIENT_CREDENTIAL_ROTATION];

// Request headers
pub const HEADER_ACCESS_TOKEN: &str = "x-amz-access-token";
pub const HEADER_RATE_LIMIT: &str = "x-amzn-ratelimit-limit";
pub const DEFAULT_CONTENT_TYPE: &str = "application/json; charset=utf-8";

// Report polling
pub const DEFAULT_REPORT_POLL_INTERVAL_MS: u64 = 10_000;
pub const REPORTS_ENDPOINT: &str = "reports";

// Document transfer
pub const SUPPORTED_COMPRESSION: &str = "GZIP";
pub const DEFAULT_CHARSET: &str = "utf-8";

/// Default user agent sent with every API call.
pub fn default_user_agent() -> String {
    format!("spapi-orchestrator/{} (Language=Rust)", env!("CARGO_PKG_VERSION"))
}
