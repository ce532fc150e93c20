//! Endpoint registry
//!
//! Maps `(endpoint, version)` to the operations defined there, each backed by
//! a pure builder `(params) -> RequestDescriptor`. Versions are kept oldest
//! to newest whatever order they are registered in: `vN` identifiers come
//! before dated ones, and dated identifiers compare lexically.

mod builtin;

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use spapi_domain::{
    GrantlessScope, HttpMethod, OperationParams, RequestDescriptor, Result, SpApiError,
};

/// Builder producing the request shape for one operation.
pub type OperationBuilder =
    Arc<dyn Fn(&OperationParams) -> Result<RequestDescriptor> + Send + Sync>;

/// One version of an endpoint with its operations.
#[derive(Clone)]
pub struct EndpointVersion {
    version: String,
    operations: BTreeMap<String, OperationBuilder>,
}

impl EndpointVersion {
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn defines(&self, operation: &str) -> bool {
        self.operations.contains_key(operation)
    }

    pub fn builder(&self, operation: &str) -> Option<&OperationBuilder> {
        self.operations.get(operation)
    }

    pub fn operations(&self) -> impl Iterator<Item = &str> {
        self.operations.keys().map(String::as_str)
    }
}

impl fmt::Debug for EndpointVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointVersion")
            .field("version", &self.version)
            .field("operations", &self.operations.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// A named group of operations sharing versioning.
#[derive(Debug, Clone)]
pub struct Endpoint {
    name: String,
    versions: Vec<EndpointVersion>,
}

impl Endpoint {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Versions ordered oldest to newest.
    pub fn versions(&self) -> &[EndpointVersion] {
        &self.versions
    }

    pub fn position(&self, version: &str) -> Option<usize> {
        self.versions.iter().position(|entry| entry.version == version)
    }

    /// Whether any version defines the operation.
    pub fn has_operation(&self, operation: &str) -> bool {
        self.versions.iter().any(|entry| entry.defines(operation))
    }
}

/// Registry of endpoints, versions and operation builders.
#[derive(Debug, Clone, Default)]
pub struct EndpointRegistry {
    endpoints: BTreeMap<String, Endpoint>,
}

impl EndpointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the built-in operation catalog.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        builtin::register_all(&mut registry);
        registry
    }

    /// Register a builder. Unknown versions are inserted at their place in
    /// the endpoint's oldest-to-newest order.
    pub fn register(
        &mut self,
        endpoint: &str,
        version: &str,
        operation: &str,
        builder: OperationBuilder,
    ) -> &mut Self {
        let entry = self.endpoints.entry(endpoint.to_string()).or_insert_with(|| Endpoint {
            name: endpoint.to_string(),
            versions: Vec::new(),
        });
        let index = match entry.position(version) {
            Some(index) => index,
            None => {
                let index = entry.versions.partition_point(|existing| {
                    compare_versions(&existing.version, version) == Ordering::Less
                });
                entry.versions.insert(
                    index,
                    EndpointVersion { version: version.to_string(), operations: BTreeMap::new() },
                );
                index
            }
        };
        entry.versions[index].operations.insert(operation.to_string(), builder);
        self
    }

    /// Register an operation declared as a template.
    pub fn register_template(
        &mut self,
        endpoint: &str,
        version: &str,
        operation: &str,
        template: OperationTemplate,
    ) -> &mut Self {
        let builder = template.into_builder(operation);
        self.register(endpoint, version, operation, builder)
    }

    pub fn endpoint(&self, name: &str) -> Option<&Endpoint> {
        self.endpoints.get(name)
    }

    pub fn endpoints(&self) -> impl Iterator<Item = &Endpoint> {
        self.endpoints.values()
    }
}

/// Age order of two version identifiers. `vN` forms predate dated
/// (`YYYY-MM-DD`) ones and compare by number; dated forms compare lexically.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    fn numbered(version: &str) -> Option<u64> {
        version.strip_prefix('v').and_then(|number| number.parse().ok())
    }
    match (numbered(a), numbered(b)) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

/// Declarative description of an operation: method, path template with
/// `{param}` placeholders, default restore rate and optional grantless scope.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationTemplate {
    pub method: HttpMethod,
    pub path: String,
    pub restore_rate: Option<f64>,
    pub scope: Option<GrantlessScope>,
}

impl OperationTemplate {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self { method, path: path.into(), restore_rate: None, scope: None }
    }

    #[must_use]
    pub fn restore_rate(mut self, seconds: f64) -> Self {
        self.restore_rate = Some(seconds);
        self
    }

    #[must_use]
    pub fn scope(mut self, scope: GrantlessScope) -> Self {
        self.scope = Some(scope);
        self
    }

    /// Build the request descriptor for `params`.
    ///
    /// # Errors
    /// Returns `MissingPathParameter` when a placeholder has no value.
    pub fn build(&self, operation: &str, params: &OperationParams) -> Result<RequestDescriptor> {
        let path = expand_path(&self.path, operation, params)?;
        let mut descriptor = RequestDescriptor::new(self.method, path);
        descriptor.query = params.query.clone().filter(|query| !query.is_empty());
        descriptor.body = params.body.clone();
        descriptor.restore_rate = self.restore_rate;
        descriptor.scope = self.scope.map(|scope| scope.as_str().to_string());
        Ok(descriptor)
    }

    pub fn into_builder(self, operation: &str) -> OperationBuilder {
        let operation = operation.to_string();
        Arc::new(move |params: &OperationParams| self.build(&operation, params))
    }
}

fn expand_path(template: &str, operation: &str, params: &OperationParams) -> Result<String> {
    let mut path = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        let name = &rest[start + 1..start + len];
        let value = params.path.get(name).and_then(path_segment).ok_or_else(|| {
            SpApiError::MissingPathParameter {
                operation: operation.to_string(),
                parameter: name.to_string(),
            }
        })?;
        path.push_str(&rest[..start]);
        path.push_str(&urlencoding::encode(&value));
        rest = &rest[start + len + 1..];
    }
    path.push_str(rest);
    Ok(path)
}

fn path_segment(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn params(path: Value) -> OperationParams {
        OperationParams {
            path: path.as_object().cloned().unwrap_or_default(),
            ..OperationParams::default()
        }
    }

    #[test]
    fn template_expands_and_encodes_path_parameters() {
        let template = OperationTemplate::new(
            HttpMethod::Get,
            "/notifications/v1/subscriptions/{notificationType}/{subscriptionId}",
        );
        let descriptor = template
            .build("getSubscriptionById", &params(json!({
                "notificationType": "ANY_OFFER_CHANGED",
                "subscriptionId": "a b/c"
            })))
            .unwrap();
        assert_eq!(
            descriptor.path,
            "/notifications/v1/subscriptions/ANY_OFFER_CHANGED/a%20b%2Fc"
        );
    }

    #[test]
    fn template_reports_missing_parameter() {
        let template = OperationTemplate::new(HttpMethod::Get, "/reports/2021-06-30/reports/{reportId}");
        let err = template.build("getReport", &OperationParams::default()).unwrap_err();
        assert_eq!(
            err,
            SpApiError::MissingPathParameter {
                operation: "getReport".into(),
                parameter: "reportId".into()
            }
        );
    }

    #[test]
    fn versions_keep_registration_order() {
        let mut registry = EndpointRegistry::new();
        let template = OperationTemplate::new(HttpMethod::Get, "/x");
        registry
            .register_template("finances", "v0", "listFinancialEvents", template.clone())
            .register_template("finances", "2024-06-19", "listTransactions", template.clone())
            .register_template("finances", "v0", "listFinancialEventGroups", template);

        let endpoint = registry.endpoint("finances").unwrap();
        let versions: Vec<_> = endpoint.versions().iter().map(EndpointVersion::version).collect();
        assert_eq!(versions, vec!["v0", "2024-06-19"]);
        assert!(endpoint.versions()[0].defines("listFinancialEventGroups"));
        assert!(endpoint.has_operation("listTransactions"));
    }

    #[test]
    fn builtin_catalog_covers_report_lifecycle() {
        let registry = EndpointRegistry::builtin();
        let reports = registry.endpoint("reports").unwrap();
        let latest = reports.versions().last().unwrap();
        for operation in ["createReport", "getReport", "cancelReport", "getReportDocument"] {
            assert!(latest.defines(operation), "{operation} missing");
        }

        let builder = latest.builder("getReport").unwrap();
        let descriptor = builder(&params(json!({ "reportId": "R-1" }))).unwrap();
        assert_eq!(descriptor.method, HttpMethod::Get);
        assert_eq!(descriptor.path, "/reports/2021-06-30/reports/R-1");
        assert_eq!(descriptor.restore_rate, Some(0.5));
    }

    #[test]
    fn grantless_operations_carry_scope() {
        let registry = EndpointRegistry::builtin();
        let notifications = registry.endpoint("notifications").unwrap();
        let builder = notifications.versions()[0].builder("getDestinations").unwrap();
        let descriptor = builder(&OperationParams::default()).unwrap();
        assert_eq!(descriptor.scope.as_deref(), Some("sellingpartnerapi::notifications"));
    }

    #[test]
    fn late_registered_versions_take_their_age_position() {
        let template = OperationTemplate::new(HttpMethod::Get, "/finances");
        let mut registry = EndpointRegistry::new();
        registry
            .register_template("finances", "2024-06-19", "listTransactions", template.clone())
            .register_template("finances", "v0", "listFinancialEvents", template.clone())
            .register_template("finances", "2020-01-01", "listLegacy", template.clone())
            .register_template("finances", "v10", "listNumbered", template.clone())
            .register_template("finances", "v2", "listNumbered", template);

        let versions: Vec<_> = registry
            .endpoint("finances")
            .unwrap()
            .versions()
            .iter()
            .map(EndpointVersion::version)
            .collect();
        assert_eq!(versions, vec!["v0", "v2", "v10", "2020-01-01", "2024-06-19"]);
    }
}
