//! Request orchestration: build, authorize, dispatch, classify, recover.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use spapi_core::{classify_response, restore_delay, ApiCaller, Outcome, Sleeper, VersionResolver};
use spapi_domain::constants::{DEFAULT_CONTENT_TYPE, HEADER_ACCESS_TOKEN, HEADER_RATE_LIMIT};
use spapi_domain::{
    AccessToken, ApiResponse, CallRequest, ClientOptions, GrantlessScope, HttpMethod,
    RequestDescriptor, ResolvedOperation, Result, SpApiError,
};
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::auth::TokenManager;
use crate::http::{HttpClient, HttpResponse};

/// A request after the build phase, reused unchanged by every retry.
#[derive(Debug)]
struct PreparedCall {
    descriptor: RequestDescriptor,
    resolved: Option<ResolvedOperation>,
    scope: Option<GrantlessScope>,
    raw_result: bool,
}

/// Token picked for one dispatch.
struct Bearer {
    /// Token of the slot the call depends on, refreshed when it expires
    slot_token: AccessToken,
    header: String,
}

/// Central call state machine behind [`ApiCaller`].
pub struct RequestOrchestrator {
    http: HttpClient,
    tokens: Arc<TokenManager>,
    resolver: VersionResolver,
    sleeper: Arc<dyn Sleeper>,
    base_url: Url,
    options: ClientOptions,
}

impl RequestOrchestrator {
    pub fn new(
        http: HttpClient,
        tokens: Arc<TokenManager>,
        resolver: VersionResolver,
        sleeper: Arc<dyn Sleeper>,
        base_url: Url,
        options: ClientOptions,
    ) -> Self {
        Self { http, tokens, resolver, sleeper, base_url, options }
    }

    pub fn resolver(&self) -> &VersionResolver {
        &self.resolver
    }

    /// Build phase: resolve the operation (or validate the raw method) and
    /// merge caller overrides into the descriptor.
    fn prepare(&self, request: &CallRequest) -> Result<PreparedCall> {
        let (mut descriptor, resolved) = match &request.api_path {
            Some(api_path) => {
                let method = HttpMethod::parse(request.method.as_deref().unwrap_or_default())?;
                let mut descriptor = RequestDescriptor::new(method, api_path.clone());
                descriptor.query = request.query.clone();
                descriptor.body = request.body.clone();
                (descriptor, None)
            }
            None => {
                let resolved = self.resolver.resolve(
                    request.operation.as_deref(),
                    request.endpoint.as_deref(),
                    request.options.version.as_deref(),
                )?;
                let builder = self.resolver.builder(&resolved)?;
                (builder(&request.params())?, Some(resolved))
            }
        };

        if let Some(rate) = request.options.restore_rate.filter(|rate| rate.is_finite()) {
            descriptor.restore_rate = Some(rate);
        }
        descriptor.timeouts =
            request.options.timeouts.or(&descriptor.timeouts).or(&self.options.timeouts);
        descriptor.headers.extend(request.headers.clone());
        if request.restricted_data_token.is_some() {
            descriptor.restricted_data_token = request.restricted_data_token.clone();
        }
        let scope = descriptor.scope.as_deref().map(GrantlessScope::parse).transpose()?;

        Ok(PreparedCall { descriptor, resolved, scope, raw_result: request.options.raw_result })
    }

    /// Authorization gate and bearer selection.
    async fn authorize(&self, call: &PreparedCall) -> Result<Bearer> {
        let slot_token = self.tokens.ensure_token(call.scope, &call.descriptor.timeouts).await?;
        let header = match (&call.scope, &call.descriptor.restricted_data_token) {
            (Some(_), _) | (None, None) => slot_token.as_str().to_string(),
            (None, Some(rdt)) => rdt.clone(),
        };
        Ok(Bearer { slot_token, header })
    }

    async fn dispatch(&self, call: &PreparedCall, bearer: &Bearer) -> Result<HttpResponse> {
        let descriptor = &call.descriptor;
        let url = self.url_for(descriptor)?;

        let mut headers = BTreeMap::from([
            (HEADER_ACCESS_TOKEN.to_string(), bearer.header.clone()),
            ("content-type".to_string(), DEFAULT_CONTENT_TYPE.to_string()),
        ]);
        headers.extend(
            descriptor.headers.iter().map(|(name, value)| (name.to_ascii_lowercase(), value.clone())),
        );

        let mut builder = self.http.request(to_reqwest(descriptor.method), url);
        for (name, value) in &headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &descriptor.body {
            let bytes = serde_json::to_vec(body)
                .map_err(|e| SpApiError::Parse(format!("request body is not serializable: {e}")))?;
            builder = builder.body(bytes);
        }

        self.log(format_args!("{} {}", descriptor.method, descriptor.path));
        let response = self.http.execute(builder, &descriptor.timeouts).await?;
        self.log(format_args!(
            "{} {} -> {} ({} bytes)",
            descriptor.method,
            descriptor.path,
            response.status,
            response.body.len()
        ));
        Ok(response)
    }

    fn url_for(&self, descriptor: &RequestDescriptor) -> Result<Url> {
        let mut url = self.base_url.join(descriptor.path.trim_start_matches('/')).map_err(|e| {
            SpApiError::Config(format!("invalid request path '{}': {e}", descriptor.path))
        })?;
        if let Some(query) = descriptor.query.as_ref().filter(|query| !query.is_empty()) {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in query {
                if let Some(value) = query_value(value) {
                    pairs.append_pair(name, &value);
                }
            }
        }
        Ok(url)
    }

    fn log(&self, message: std::fmt::Arguments<'_>) {
        if self.options.debug_log {
            info!("{message}");
        } else {
            debug!("{message}");
        }
    }

    fn throttle_delay(&self, call: &PreparedCall, rate_limit: Option<&str>, attempt: u32) -> Duration {
        restore_delay(rate_limit, call.descriptor.restore_rate)
            .map(|base| self.options.retry.backoff.delay(base, attempt))
            .unwrap_or_default()
    }
}

#[async_trait]
impl ApiCaller for RequestOrchestrator {
    /// Run one call to completion.
    ///
    /// Expired tokens are refreshed and throttled requests re-issued after the
    /// restore delay, within the limits of the configured retry policy.
    #[instrument(skip_all, fields(
        operation = request.operation.as_deref(),
        endpoint = request.endpoint.as_deref(),
        api_path = request.api_path.as_deref(),
    ))]
    async fn call(&self, request: CallRequest) -> Result<ApiResponse> {
        let call = self.prepare(&request)?;
        if let Some(resolved) = &call.resolved {
            debug!(
                endpoint = %resolved.endpoint,
                operation = %resolved.operation,
                version = %resolved.version,
                "operation resolved"
            );
        }

        if self.options.only_grantless_operations && call.scope.is_none() {
            return Err(SpApiError::InvalidOperation(format!(
                "'{}' is not a grantless operation and the client is restricted to grantless operations",
                describe(&request)
            )));
        }

        let retry = self.options.retry;
        let mut refreshes = 0u32;
        let mut throttles = 0u32;

        loop {
            let bearer = self.authorize(&call).await?;
            let response = self.dispatch(&call, &bearer).await?;

            if call.raw_result {
                return Ok(ApiResponse::Raw(response.into_raw()));
            }

            let rate_limit = response.header(HEADER_RATE_LIMIT);
            let outcome =
                classify_response(response.status, rate_limit, &response.body, self.options.use_sandbox)?;

            match outcome {
                Outcome::Success(result) => return Ok(result),
                Outcome::TokenExpired { message } => {
                    if !self.options.auto_request_tokens || !retry.allows_token_refresh(refreshes) {
                        return Err(SpApiError::AccessTokenExpired { message });
                    }
                    refreshes += 1;
                    warn!(attempt = refreshes, "access token expired, refreshing");
                    self.tokens
                        .refresh_if_stale(call.scope, Some(&bearer.slot_token), &call.descriptor.timeouts)
                        .await?;
                }
                Outcome::Throttled { message, rate_limit } => {
                    if !self.options.auto_request_throttled || !retry.allows_throttle_retry(throttles) {
                        return Err(SpApiError::QuotaExceeded { message, rate_limit });
                    }
                    throttles += 1;
                    let delay = self.throttle_delay(&call, rate_limit.as_deref(), throttles);
                    warn!(
                        attempt = throttles,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "request throttled, retrying"
                    );
                    self.sleeper.sleep(delay).await;
                }
            }
        }
    }
}

fn describe(request: &CallRequest) -> String {
    match (&request.operation, &request.api_path) {
        (Some(operation), _) => operation.clone(),
        (None, Some(api_path)) => api_path.clone(),
        (None, None) => String::new(),
    }
}

/// Query values travel as plain strings; arrays are comma-joined.
fn query_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        Value::Array(items) => Some(
            items.iter().filter_map(query_value).collect::<Vec<_>>().join(","),
        ),
        other => Some(other.to_string()),
    }
}

fn to_reqwest(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Delete => Method::DELETE,
        HttpMethod::Patch => Method::PATCH,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn query_arrays_are_comma_joined() {
        assert_eq!(
            query_value(&json!(["ATVPDKIKX0DER", "A2EUQ1WTGCTBG2"])).as_deref(),
            Some("ATVPDKIKX0DER,A2EUQ1WTGCTBG2")
        );
        assert_eq!(query_value(&json!("2024-01-01T00:00:00Z")).as_deref(), Some("2024-01-01T00:00:00Z"));
        assert_eq!(query_value(&json!(25)).as_deref(), Some("25"));
        assert_eq!(query_value(&json!(true)).as_deref(), Some("true"));
        assert_eq!(query_value(&Value::Null), None);
    }

    #[test]
    fn methods_map_one_to_one() {
        for method in ["GET", "POST", "PUT", "DELETE", "PATCH"] {
            let parsed = HttpMethod::parse(method).unwrap();
            assert_eq!(to_reqwest(parsed).as_str(), method);
        }
    }
}
