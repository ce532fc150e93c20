//! Error types used throughout the client
//!
//! Every failure surfaces as a single [`SpApiError`] value carrying a stable
//! machine-readable code ([`SpApiError::code`]), a human message (`Display`)
//! and optional retry metadata ([`SpApiError::retry_after`]).

use std::borrow::Cow;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coarse classification of failures, used for retry decisions and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Invalid or missing settings, detected at construction
    Configuration,
    /// Unknown endpoint/operation/version
    Resolution,
    /// Missing token, invalid scope, failed token exchange
    Authorization,
    /// Expired token or exhausted quota
    TransientRemote,
    /// Any other error reported by the remote API
    Remote,
    /// Transport failures and undecodable payloads
    TransportDecode,
    /// Report processing ended without a document
    ReportLifecycle,
}

/// Main error type for the client
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SpApiError {
    // --- Configuration -------------------------------------------------
    #[error("Invalid region '{0}' (expected one of: na, eu, fe)")]
    InvalidRegion(String),

    #[error("No refresh token present; provide one or enable grantless-only mode")]
    NoRefreshTokenPresent,

    #[error("Missing app credentials: {0}")]
    MissingCredentials(String),

    #[error("Version pin '{version}' for endpoint '{endpoint}' is not a known version")]
    InvalidVersionPin { endpoint: String, version: String },

    #[error("Configuration error: {0}")]
    Config(String),

    // --- Resolution ----------------------------------------------------
    #[error("No operation given")]
    NoOperationGiven,

    #[error("No endpoint given for operation '{0}'")]
    NoEndpointGiven(String),

    #[error("Endpoint '{0}' not found")]
    EndpointNotFound(String),

    #[error("Operation '{operation}' is not defined for endpoint '{endpoint}'")]
    InvalidOperationForEndpoint { endpoint: String, operation: String },

    #[error("Version '{version}' is not a valid version of endpoint '{endpoint}'")]
    InvalidVersion { endpoint: String, version: String },

    #[error("Operation '{operation}' of endpoint '{endpoint}' not found for version '{version}'")]
    OperationNotFoundForVersion { endpoint: String, operation: String, version: String },

    #[error("No valid method provided: '{0}' (expected GET, POST, PUT, DELETE or PATCH)")]
    NoValidMethodProvided(String),

    #[error("Missing path parameter '{parameter}' for operation '{operation}'")]
    MissingPathParameter { operation: String, parameter: String },

    // --- Authorization -------------------------------------------------
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("No access token present; enable auto token requests or supply a token")]
    NoAccessTokenPresent,

    #[error("No scope provided; grantless-only clients must request a scoped token")]
    NoScopeProvided,

    #[error("Invalid scope '{0}'")]
    InvalidScope(String),

    #[error("Token exchange failed ({code}): {description}")]
    TokenExchange { code: String, description: String },

    // --- Transient remote ----------------------------------------------
    #[error("Access token expired: {message}")]
    AccessTokenExpired { message: String },

    #[error("Quota exceeded: {message}")]
    QuotaExceeded { message: String, rate_limit: Option<String> },

    // --- Remote --------------------------------------------------------
    #[error("Invalid sandbox parameters: {message}")]
    InvalidSandboxParameters { message: String },

    #[error("{code}: {message}")]
    Remote { code: String, message: String, details: Option<String>, status: u16 },

    // --- Transport / decode --------------------------------------------
    #[error("Transport error: {message}")]
    Transport { message: String, timeout: Option<Duration> },

    #[error("Response body is not valid JSON: {body}")]
    JsonParse { body: String },

    #[error("Unable to decode content with charset '{charset}'")]
    Decode { charset: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Unknown compression standard '{0}' (only GZIP is supported)")]
    UnknownZipStandard(String),

    #[error("Invalid document details: {0}")]
    InvalidDocumentDetails(String),

    #[error("No feed content provided (give inline content or a file path)")]
    NoFeedContentProvided,

    #[error("No feed content type provided")]
    NoFeedContentTypeProvided,

    #[error("I/O error: {0}")]
    Io(String),

    // --- Report lifecycle ----------------------------------------------
    #[error("Report processing ended with status {status}")]
    ReportProcessing { status: String },

    #[error("Report processing cancelled after {tries} tries at {interval_ms} ms intervals")]
    ReportProcessingCancelledManually { tries: u32, interval_ms: u64 },
}

impl SpApiError {
    /// Stable machine-readable error code.
    pub fn code(&self) -> Cow<'_, str> {
        let code = match self {
            Self::InvalidRegion(_) => "INVALID_REGION",
            Self::NoRefreshTokenPresent => "NO_REFRESH_TOKEN_PRESENT",
            Self::MissingCredentials(_) => "CREDENTIALS_MISSING",
            Self::InvalidVersionPin { .. } => "INVALID_VERSION_PIN",
            Self::Config(_) => "CONFIGURATION_ERROR",
            Self::NoOperationGiven => "NO_OPERATION_GIVEN",
            Self::NoEndpointGiven(_) => "NO_ENDPOINT_GIVEN",
            Self::EndpointNotFound(_) => "ENDPOINT_NOT_FOUND",
            Self::InvalidOperationForEndpoint { .. } => "INVALID_OPERATION_FOR_ENDPOINT",
            Self::InvalidVersion { .. } => "INVALID_VERSION",
            Self::OperationNotFoundForVersion { .. } => "OPERATION_NOT_FOUND_FOR_VERSION",
            Self::NoValidMethodProvided(_) => "NO_VALID_METHOD_PROVIDED",
            Self::MissingPathParameter { .. } => "MISSING_PATH_PARAMETER",
            Self::InvalidOperation(_) => "INVALID_OPERATION_ERROR",
            Self::NoAccessTokenPresent => "NO_ACCESS_TOKEN_PRESENT",
            Self::NoScopeProvided => "NO_SCOPE_PROVIDED",
            Self::InvalidScope(_) => "INVALID_SCOPE_ERROR",
            Self::TokenExchange { code, .. } => return Cow::Borrowed(code.as_str()),
            Self::AccessTokenExpired { .. } => "ACCESS_TOKEN_EXPIRED",
            Self::QuotaExceeded { .. } => "QUOTA_EXCEEDED",
            Self::InvalidSandboxParameters { .. } => "INVALID_SANDBOX_PARAMETERS",
            Self::Remote { code, .. } => return Cow::Borrowed(code.as_str()),
            Self::Transport { .. } => "TRANSPORT_ERROR",
            Self::JsonParse { .. } => "JSON_PARSE_ERROR",
            Self::Decode { .. } => "DECODE_ERROR",
            Self::Parse(_) => "PARSE_ERROR",
            Self::UnknownZipStandard(_) => "UNKNOWN_ZIP_STANDARD",
            Self::InvalidDocumentDetails(_) => "DOWNLOAD_INFORMATION_MISSING",
            Self::NoFeedContentProvided => "NO_FEED_CONTENT_PROVIDED",
            Self::NoFeedContentTypeProvided => "NO_FEED_CONTENT_TYPE_PROVIDED",
            Self::Io(_) => "IO_ERROR",
            Self::ReportProcessing { status } => {
                return Cow::Owned(format!("REPORT_PROCESSING_{status}"));
            }
            Self::ReportProcessingCancelledManually { .. } => {
                "REPORT_PROCESSING_CANCELLED_MANUALLY"
            }
        };
        Cow::Borrowed(code)
    }

    /// Classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidRegion(_)
            | Self::NoRefreshTokenPresent
            | Self::MissingCredentials(_)
            | Self::InvalidVersionPin { .. }
            | Self::Config(_) => ErrorKind::Configuration,
            Self::NoOperationGiven
            | Self::NoEndpointGiven(_)
            | Self::EndpointNotFound(_)
            | Self::InvalidOperationForEndpoint { .. }
            | Self::InvalidVersion { .. }
            | Self::OperationNotFoundForVersion { .. }
            | Self::NoValidMethodProvided(_)
            | Self::MissingPathParameter { .. } => ErrorKind::Resolution,
            Self::InvalidOperation(_)
            | Self::NoAccessTokenPresent
            | Self::NoScopeProvided
            | Self::InvalidScope(_)
            | Self::TokenExchange { .. } => ErrorKind::Authorization,
            Self::AccessTokenExpired { .. } | Self::QuotaExceeded { .. } => {
                ErrorKind::TransientRemote
            }
            Self::InvalidSandboxParameters { .. } | Self::Remote { .. } => ErrorKind::Remote,
            Self::Transport { .. }
            | Self::JsonParse { .. }
            | Self::Decode { .. }
            | Self::Parse(_)
            | Self::UnknownZipStandard(_)
            | Self::InvalidDocumentDetails(_)
            | Self::NoFeedContentProvided
            | Self::NoFeedContentTypeProvided
            | Self::Io(_) => ErrorKind::TransportDecode,
            Self::ReportProcessing { .. } | Self::ReportProcessingCancelledManually { .. } => {
                ErrorKind::ReportLifecycle
            }
        }
    }

    /// Whether the condition is expected to clear on its own.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::TransientRemote
    }

    /// Retry hint derived from the error metadata.
    ///
    /// Quota errors carry the `x-amzn-ratelimit-limit` value (requests per
    /// second); transport timeouts carry the budget that was exceeded.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::QuotaExceeded { rate_limit: Some(limit), .. } => limit
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|rate| rate.is_finite() && *rate > 0.0)
                .map(|rate| Duration::from_secs_f64(1.0 / rate)),
            Self::Transport { timeout, .. } => *timeout,
            _ => None,
        }
    }
}

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, SpApiError>;
