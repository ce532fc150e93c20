//! Version resolution
//!
//! Picks the concrete API version that answers an operation call. Resolution
//! runs on every call; only the per-endpoint pins are fixed at construction.

use std::collections::BTreeMap;
use std::sync::Arc;

use spapi_domain::{ResolvedOperation, Result, SpApiError};
use tracing::debug;

use crate::registry::{Endpoint, EndpointRegistry, OperationBuilder};

/// Resolves `(operation, endpoint, version?)` against an [`EndpointRegistry`].
#[derive(Debug, Clone)]
pub struct VersionResolver {
    registry: Arc<EndpointRegistry>,
    pins: BTreeMap<String, String>,
    fallback: bool,
}

impl VersionResolver {
    /// Create a resolver with per-endpoint version pins.
    ///
    /// # Errors
    /// Returns `InvalidVersionPin` if a pin names an unknown endpoint or a
    /// version the endpoint does not have.
    pub fn new(
        registry: Arc<EndpointRegistry>,
        pins: BTreeMap<String, String>,
        fallback: bool,
    ) -> Result<Self> {
        for (endpoint, version) in &pins {
            let known = registry
                .endpoint(endpoint)
                .is_some_and(|entry| entry.position(version).is_some());
            if !known {
                return Err(SpApiError::InvalidVersionPin {
                    endpoint: endpoint.clone(),
                    version: version.clone(),
                });
            }
        }
        Ok(Self { registry, pins, fallback })
    }

    pub fn registry(&self) -> &EndpointRegistry {
        &self.registry
    }

    /// Resolve the version for an operation.
    ///
    /// `operation` may use the dotted `endpoint.operation` form, which takes
    /// precedence over `endpoint`. The reference version is `explicit`, else
    /// the construction-time pin. Without either, the oldest version that
    /// defines the operation wins. When the reference version lacks the
    /// operation, only older versions are searched, nearest first.
    pub fn resolve(
        &self,
        operation: Option<&str>,
        endpoint: Option<&str>,
        explicit: Option<&str>,
    ) -> Result<ResolvedOperation> {
        let operation = operation.map(str::trim).filter(|op| !op.is_empty());
        let Some(operation) = operation else {
            return Err(SpApiError::NoOperationGiven);
        };
        let (endpoint_name, operation) = match operation.split_once('.') {
            Some((endpoint, operation)) => (Some(endpoint), operation),
            None => (endpoint.map(str::trim).filter(|ep| !ep.is_empty()), operation),
        };
        let endpoint_name =
            endpoint_name.ok_or_else(|| SpApiError::NoEndpointGiven(operation.to_string()))?;
        let entry = self
            .registry
            .endpoint(endpoint_name)
            .ok_or_else(|| SpApiError::EndpointNotFound(endpoint_name.to_string()))?;
        if !entry.has_operation(operation) {
            return Err(SpApiError::InvalidOperationForEndpoint {
                endpoint: endpoint_name.to_string(),
                operation: operation.to_string(),
            });
        }

        let reference = explicit.or_else(|| self.pins.get(endpoint_name).map(String::as_str));
        let version = match reference {
            Some(reference) => self.resolve_from(entry, operation, reference)?,
            None => entry
                .versions()
                .iter()
                .find(|candidate| candidate.defines(operation))
                .map(|candidate| candidate.version().to_string())
                .ok_or_else(|| SpApiError::InvalidOperationForEndpoint {
                    endpoint: endpoint_name.to_string(),
                    operation: operation.to_string(),
                })?,
        };

        Ok(ResolvedOperation {
            endpoint: endpoint_name.to_string(),
            operation: operation.to_string(),
            version,
        })
    }

    /// Builder for an already resolved operation.
    pub fn builder(&self, resolved: &ResolvedOperation) -> Result<OperationBuilder> {
        self.registry
            .endpoint(&resolved.endpoint)
            .and_then(|entry| entry.position(&resolved.version).map(|index| &entry.versions()[index]))
            .and_then(|version| version.builder(&resolved.operation))
            .cloned()
            .ok_or_else(|| SpApiError::OperationNotFoundForVersion {
                endpoint: resolved.endpoint.clone(),
                operation: resolved.operation.clone(),
                version: resolved.version.clone(),
            })
    }

    fn resolve_from(&self, entry: &Endpoint, operation: &str, reference: &str) -> Result<String> {
        let index = entry.position(reference).ok_or_else(|| SpApiError::InvalidVersion {
            endpoint: entry.name().to_string(),
            version: reference.to_string(),
        })?;
        let versions = entry.versions();
        if versions[index].defines(operation) {
            return Ok(reference.to_string());
        }
        let not_found = || SpApiError::OperationNotFoundForVersion {
            endpoint: entry.name().to_string(),
            operation: operation.to_string(),
            version: reference.to_string(),
        };
        if !self.fallback {
            return Err(not_found());
        }
        let older = versions[..index]
            .iter()
            .rev()
            .find(|candidate| candidate.defines(operation))
            .ok_or_else(not_found)?;
        debug!(
            endpoint = entry.name(),
            operation,
            requested = reference,
            resolved = older.version(),
            "Falling back to older API version"
        );
        Ok(older.version().to_string())
    }
}
