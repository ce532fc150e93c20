//! Request-side types: what callers ask for and what gets dispatched

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{Result, SpApiError};
use crate::impl_wire_conversions;
use crate::utils::serde::option_duration_millis;

/// Query parameters as a JSON object (arrays are comma-joined on the wire).
pub type QueryMap = Map<String, Value>;

/// HTTP methods accepted for raw-path calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl_wire_conversions!(HttpMethod {
    Get => "GET",
    Post => "POST",
    Put => "PUT",
    Delete => "DELETE",
    Patch => "PATCH",
});

impl HttpMethod {
    /// Parse a caller-supplied method, rejecting anything outside the
    /// enumerated set.
    pub fn parse(method: &str) -> Result<Self> {
        method.trim().parse().map_err(|_| SpApiError::NoValidMethodProvided(method.to_string()))
    }
}

/// Per-call time budgets.
///
/// - `response`: time until response headers arrive
/// - `idle`: maximum gap between body chunks
/// - `deadline`: total time for the whole exchange
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeouts {
    #[serde(default, with = "option_duration_millis")]
    pub response: Option<Duration>,
    #[serde(default, with = "option_duration_millis")]
    pub idle: Option<Duration>,
    #[serde(default, with = "option_duration_millis")]
    pub deadline: Option<Duration>,
}

impl Timeouts {
    /// Field-wise override: values set on `self` win over `defaults`.
    #[must_use]
    pub fn or(&self, defaults: &Self) -> Self {
        Self {
            response: self.response.or(defaults.response),
            idle: self.idle.or(defaults.idle),
            deadline: self.deadline.or(defaults.deadline),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.response.is_none() && self.idle.is_none() && self.deadline.is_none()
    }
}

/// The concrete (endpoint, operation, version) triple chosen for one call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResolvedOperation {
    pub endpoint: String,
    pub operation: String,
    pub version: String,
}

/// Parameters handed to an operation builder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationParams {
    #[serde(default)]
    pub path: Map<String, Value>,
    #[serde(default)]
    pub query: Option<QueryMap>,
    #[serde(default)]
    pub body: Option<Value>,
}

/// Fully shaped HTTP request, ready to be authorized and dispatched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestDescriptor {
    pub method: HttpMethod,
    pub path: String,
    #[serde(default)]
    pub query: Option<QueryMap>,
    #[serde(default)]
    pub body: Option<Value>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Minimum seconds between calls to this operation
    #[serde(default)]
    pub restore_rate: Option<f64>,
    #[serde(default)]
    pub timeouts: Timeouts,
    /// Grantless scope required by the operation, if any
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub restricted_data_token: Option<String>,
}

impl RequestDescriptor {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: None,
            body: None,
            headers: BTreeMap::new(),
            restore_rate: None,
            timeouts: Timeouts::default(),
            scope: None,
            restricted_data_token: None,
        }
    }
}

/// Per-call options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallOptions {
    /// Explicit API version for the operation
    #[serde(default)]
    pub version: Option<String>,
    /// Overrides the operation's default restore rate when finite
    #[serde(default)]
    pub restore_rate: Option<f64>,
    /// Skip response classification and return status/headers/body
    #[serde(default)]
    pub raw_result: bool,
    #[serde(default)]
    pub timeouts: Timeouts,
}

/// A caller's request: either an operation of an endpoint, or a raw
/// `api_path` + `method` pair that bypasses the registry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallRequest {
    /// Operation name, optionally in dotted `endpoint.operation` form
    #[serde(default)]
    pub operation: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub path: Map<String, Value>,
    #[serde(default)]
    pub query: Option<QueryMap>,
    #[serde(default)]
    pub body: Option<Value>,
    #[serde(default)]
    pub api_path: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub restricted_data_token: Option<String>,
    #[serde(default)]
    pub options: CallOptions,
}

impl CallRequest {
    /// Call an operation (`"getReport"` or dotted `"reports.getReport"`).
    pub fn operation(operation: impl Into<String>) -> Self {
        Self { operation: Some(operation.into()), ..Self::default() }
    }

    /// Call a raw path, bypassing the endpoint registry.
    pub fn raw(method: impl Into<String>, api_path: impl Into<String>) -> Self {
        Self { method: Some(method.into()), api_path: Some(api_path.into()), ..Self::default() }
    }

    #[must_use]
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    #[must_use]
    pub fn path_param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.path.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn query_param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.query.get_or_insert_with(Map::new).insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn restricted_data_token(mut self, token: impl Into<String>) -> Self {
        self.restricted_data_token = Some(token.into());
        self
    }

    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.options.version = Some(version.into());
        self
    }

    #[must_use]
    pub fn restore_rate(mut self, seconds: f64) -> Self {
        self.options.restore_rate = Some(seconds);
        self
    }

    #[must_use]
    pub fn raw_result(mut self, raw: bool) -> Self {
        self.options.raw_result = raw;
        self
    }

    #[must_use]
    pub fn timeouts(mut self, timeouts: Timeouts) -> Self {
        self.options.timeouts = timeouts;
        self
    }

    /// Builder parameters extracted from this request.
    pub fn params(&self) -> OperationParams {
        OperationParams { path: self.path.clone(), query: self.query.clone(), body: self.body.clone() }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn method_parse_accepts_enumerated_set_only() {
        assert_eq!(HttpMethod::parse("get").unwrap(), HttpMethod::Get);
        assert_eq!(HttpMethod::parse(" PATCH ").unwrap(), HttpMethod::Patch);
        assert!(matches!(
            HttpMethod::parse("OPTIONS"),
            Err(SpApiError::NoValidMethodProvided(method)) if method == "OPTIONS"
        ));
    }

    #[test]
    fn call_timeouts_override_defaults_per_field() {
        let defaults = Timeouts {
            response: Some(Duration::from_secs(5)),
            idle: Some(Duration::from_secs(10)),
            deadline: None,
        };
        let call = Timeouts { deadline: Some(Duration::from_secs(30)), ..Timeouts::default() };

        let merged = call.or(&defaults);
        assert_eq!(merged.response, Some(Duration::from_secs(5)));
        assert_eq!(merged.idle, Some(Duration::from_secs(10)));
        assert_eq!(merged.deadline, Some(Duration::from_secs(30)));
    }

    #[test]
    fn builder_methods_fill_request() {
        let request = CallRequest::operation("reports.getReport")
            .path_param("reportId", "R1")
            .query_param("marketplaceIds", json!(["A1", "A2"]))
            .version("2021-06-30")
            .restore_rate(2.0);

        assert_eq!(request.operation.as_deref(), Some("reports.getReport"));
        assert_eq!(request.path.get("reportId"), Some(&json!("R1")));
        assert_eq!(request.options.version.as_deref(), Some("2021-06-30"));
        assert_eq!(request.params().query.unwrap()["marketplaceIds"], json!(["A1", "A2"]));
    }

    #[test]
    fn call_request_deserializes_from_partial_json() {
        let request: CallRequest = serde_json::from_value(json!({
            "api_path": "/sellers/v1/marketplaceParticipations",
            "method": "GET",
            "options": { "timeouts": { "deadline": 2500 } }
        }))
        .unwrap();

        assert_eq!(request.method.as_deref(), Some("GET"));
        assert_eq!(request.options.timeouts.deadline, Some(Duration::from_millis(2500)));
        assert!(!request.options.raw_result);
    }
}
