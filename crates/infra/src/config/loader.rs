//! Configuration loader
//!
//! Loads client configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If incomplete, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `SELLING_PARTNER_REGION`: Region selector (`na`, `eu` or `fe`)
//! - `SELLING_PARTNER_APP_CLIENT_ID`: LWA application client id
//! - `SELLING_PARTNER_APP_CLIENT_SECRET`: LWA application client secret
//! - `SELLING_PARTNER_REFRESH_TOKEN`: Seller refresh token (optional)
//! - `SELLING_PARTNER_ACCESS_TOKEN`: Initial access token (optional)
//! - `SELLING_PARTNER_USE_SANDBOX`: Target the sandbox hosts (true/false)
//! - `SELLING_PARTNER_DEBUG_LOG`: Log call summaries at info level (true/false)
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./spapi.toml` or `./spapi.json` (current working directory)
//! 2. `./config.toml` or `./config.json` (current working directory)
//! 3. The same names in the parent and grandparent directories
//! 4. The same names relative to the executable location

use std::path::{Path, PathBuf};

use spapi_domain::{AppCredentials, ClientConfig, ClientOptions, Result, SpApiError};

const FILE_NAMES: [&str; 4] = ["spapi.toml", "spapi.json", "config.toml", "config.json"];

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If any required
/// variables are missing, falls back to loading from a config file.
///
/// # Errors
/// Returns `SpApiError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
pub fn load() -> Result<ClientConfig> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = %e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// Region and app credentials are required; everything else falls back to
/// the [`ClientOptions`] defaults.
///
/// # Errors
/// Returns `SpApiError::Config` if a required variable is missing.
pub fn load_from_env() -> Result<ClientConfig> {
    let region = env_var("SELLING_PARTNER_REGION")?;
    let credentials = AppCredentials {
        app_client_id: env_var("SELLING_PARTNER_APP_CLIENT_ID")?,
        app_client_secret: env_var("SELLING_PARTNER_APP_CLIENT_SECRET")?,
    };

    let defaults = ClientOptions::default();
    let options = ClientOptions {
        use_sandbox: env_bool("SELLING_PARTNER_USE_SANDBOX", defaults.use_sandbox),
        debug_log: env_bool("SELLING_PARTNER_DEBUG_LOG", defaults.debug_log),
        ..defaults
    };

    let mut config = ClientConfig::new(region, credentials).options(options);
    config.refresh_token = env_opt("SELLING_PARTNER_REFRESH_TOKEN");
    config.access_token = env_opt("SELLING_PARTNER_ACCESS_TOKEN");
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `SpApiError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<ClientConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(SpApiError::Config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            SpApiError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| SpApiError::Config(format!("Failed to read config file: {}", e)))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<ClientConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| SpApiError::Config(format!("Invalid TOML format: {}", e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| SpApiError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(SpApiError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// Probe multiple paths for configuration files
///
/// Searches the current working directory, its two parents and the
/// executable's directory for `spapi.{toml,json}` and `config.{toml,json}`.
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut roots = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        roots.extend([cwd.clone(), cwd.join(".."), cwd.join("../..")]);
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            roots.push(exe_dir.to_path_buf());
        }
    }

    roots
        .iter()
        .flat_map(|root| FILE_NAMES.iter().map(move |name| root.join(name)))
        .find(|path| path.exists())
}

/// Get required environment variable
///
/// # Errors
/// Returns `SpApiError::Config` if the variable is not set.
fn env_var(key: &str) -> Result<String> {
    std::env::var(key)
        .map_err(|_| SpApiError::Config(format!("Missing required environment variable: {}", key)))
}

/// Optional environment variable; blank values count as unset.
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
