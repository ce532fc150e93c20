//! Response classification
//!
//! Turns a raw API response into a payload, a recoverable condition
//! (expired token, throttling) or a typed error.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use spapi_domain::{normalize_error_code, ApiResponse, Result, SpApiError};

static TOKEN_EXPIRED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)access token.*expired").expect("TOKEN_EXPIRED regex should compile")
});

/// Classified outcome of one dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success(ApiResponse),
    /// 403 `Unauthorized` reporting an expired access token
    TokenExpired { message: String },
    /// 429 `QuotaExceeded`, with the rate-limit header when present
    Throttled { message: String, rate_limit: Option<String> },
}

/// First entry of an `errors` list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct RemoteError {
    code: String,
    message: String,
    details: Option<String>,
}

impl RemoteError {
    fn from_value(value: &Value) -> Self {
        let text = |key: &str| match value.get(key) {
            Some(Value::String(text)) => Some(text.clone()),
            Some(Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        };
        Self {
            code: text("code").unwrap_or_default(),
            message: text("message").unwrap_or_default(),
            details: text("details").filter(|details| !details.is_empty()),
        }
    }
}

/// Classify a response.
///
/// # Errors
/// - `JsonParse` when a non-204 body is not JSON (newlines are stripped first)
/// - `InvalidSandboxParameters` for `InternalFailure` in sandbox mode
/// - `Remote` with the normalized remote code for any other reported error
pub fn classify_response(
    status: u16,
    rate_limit: Option<&str>,
    body: &[u8],
    sandbox: bool,
) -> Result<Outcome> {
    if status == 204 {
        return Ok(Outcome::Success(ApiResponse::NoContent));
    }

    let text = String::from_utf8_lossy(body).replace('\n', "");
    let parsed: Value = serde_json::from_str(&text)
        .map_err(|_| SpApiError::JsonParse { body: String::from_utf8_lossy(body).into_owned() })?;

    let first_error = parsed
        .get("errors")
        .and_then(Value::as_array)
        .and_then(|errors| errors.first())
        .map(RemoteError::from_value);

    if let Some(error) = first_error {
        return classify_error(status, rate_limit, error, sandbox);
    }

    if !(200..300).contains(&status) {
        return Err(SpApiError::Remote {
            code: "HTTP_ERROR".into(),
            message: format!("request failed with status {status}"),
            details: Some(text),
            status,
        });
    }

    Ok(Outcome::Success(ApiResponse::Payload(unwrap_payload(parsed))))
}

fn classify_error(
    status: u16,
    rate_limit: Option<&str>,
    error: RemoteError,
    sandbox: bool,
) -> Result<Outcome> {
    if status == 403 && error.code == "Unauthorized" && TOKEN_EXPIRED.is_match(&error.message) {
        return Ok(Outcome::TokenExpired { message: error.message });
    }
    if status == 429 && error.code == "QuotaExceeded" {
        return Ok(Outcome::Throttled {
            message: error.message,
            rate_limit: rate_limit.map(str::to_string),
        });
    }
    let message = if error.message.is_empty() {
        error.details.clone().unwrap_or_default()
    } else {
        error.message
    };
    if sandbox && error.code == "InternalFailure" {
        return Err(SpApiError::InvalidSandboxParameters { message });
    }
    Err(SpApiError::Remote {
        code: normalize_error_code(&error.code),
        message,
        details: error.details,
        status,
    })
}

/// Extract the result from the `{payload, pagination}` envelope.
///
/// A sibling `pagination` object is merged into the payload (payload fields
/// win). Bodies without `payload` are returned whole.
fn unwrap_payload(mut body: Value) -> Value {
    let Some(object) = body.as_object_mut() else {
        return body;
    };
    let Some(payload) = object.remove("payload") else {
        return body;
    };
    match object.remove("pagination") {
        Some(Value::Object(pagination)) => merge_pagination(payload, pagination),
        _ => payload,
    }
}

fn merge_pagination(payload: Value, pagination: Map<String, Value>) -> Value {
    let mut merged = pagination;
    match payload {
        Value::Object(fields) => merged.extend(fields),
        other => {
            merged.insert("payload".to_string(), other);
        }
    }
    Value::Object(merged)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn body(value: &Value) -> Vec<u8> {
        serde_json::to_vec(value).unwrap()
    }

    #[test]
    fn no_content_skips_parsing() {
        let outcome = classify_response(204, None, b"not json", false).unwrap();
        assert_eq!(outcome, Outcome::Success(ApiResponse::NoContent));
    }

    #[test]
    fn payload_is_unwrapped() {
        let outcome =
            classify_response(200, None, &body(&json!({ "payload": { "a": 1 } })), false).unwrap();
        assert_eq!(outcome, Outcome::Success(ApiResponse::Payload(json!({ "a": 1 }))));
    }

    #[test]
    fn unwrapped_body_is_returned_whole() {
        let outcome =
            classify_response(200, None, &body(&json!({ "reportId": "R-1" })), false).unwrap();
        assert_eq!(outcome, Outcome::Success(ApiResponse::Payload(json!({ "reportId": "R-1" }))));
    }

    #[test]
    fn sibling_pagination_is_merged() {
        let response = json!({
            "payload": { "FinancialEvents": {} },
            "pagination": { "NextToken": "abc" }
        });
        let outcome = classify_response(200, None, &body(&response), false).unwrap();
        assert_eq!(
            outcome,
            Outcome::Success(ApiResponse::Payload(json!({
                "FinancialEvents": {},
                "NextToken": "abc"
            })))
        );

        let list = json!({ "payload": [1, 2], "pagination": { "nextToken": "n" } });
        let outcome = classify_response(200, None, &body(&list), false).unwrap();
        assert_eq!(
            outcome,
            Outcome::Success(ApiResponse::Payload(json!({ "payload": [1, 2], "nextToken": "n" })))
        );
    }

    #[test]
    fn newlines_are_stripped_before_parsing() {
        let outcome = classify_response(200, None, b"{\"payload\":\n{\"ok\":\ntrue}}\n", false).unwrap();
        assert_eq!(outcome, Outcome::Success(ApiResponse::Payload(json!({ "ok": true }))));
    }

    #[test]
    fn invalid_json_carries_raw_body() {
        let err = classify_response(200, None, b"<html>oops</html>", false).unwrap_err();
        assert_eq!(err, SpApiError::JsonParse { body: "<html>oops</html>".into() });
    }

    #[test]
    fn expired_token_is_recoverable() {
        let response = json!({ "errors": [{
            "code": "Unauthorized",
            "message": "The access token you provided has expired."
        }]});
        let outcome = classify_response(403, None, &body(&response), false).unwrap();
        assert!(matches!(outcome, Outcome::TokenExpired { .. }));

        let denied = json!({ "errors": [{ "code": "Unauthorized", "message": "Access to requested resource is denied." }]});
        let err = classify_response(403, None, &body(&denied), false).unwrap_err();
        assert_eq!(err.code(), "UNAUTHORIZED");
    }

    #[test]
    fn quota_exceeded_keeps_rate_limit() {
        let response = json!({ "errors": [{ "code": "QuotaExceeded", "message": "You exceeded your quota" }]});
        let outcome = classify_response(429, Some("2.0"), &body(&response), false).unwrap();
        assert_eq!(
            outcome,
            Outcome::Throttled {
                message: "You exceeded your quota".into(),
                rate_limit: Some("2.0".into())
            }
        );
    }

    #[test]
    fn internal_failure_in_sandbox_is_specific() {
        let response = json!({ "errors": [{ "code": "InternalFailure", "message": "boom" }]});
        let sandbox = classify_response(500, None, &body(&response), true).unwrap_err();
        assert_eq!(sandbox, SpApiError::InvalidSandboxParameters { message: "boom".into() });

        let production = classify_response(500, None, &body(&response), false).unwrap_err();
        assert_eq!(production.code(), "INTERNAL_FAILURE");
    }

    #[test]
    fn remote_code_is_normalized_and_message_falls_back_to_details() {
        let response = json!({ "errors": [
            { "code": "InvalidInput", "details": "marketplaceIds is required" },
            { "code": "Ignored", "message": "second" }
        ]});
        let err = classify_response(400, None, &body(&response), false).unwrap_err();
        assert_eq!(
            err,
            SpApiError::Remote {
                code: "INVALID_INPUT".into(),
                message: "marketplaceIds is required".into(),
                details: Some("marketplaceIds is required".into()),
                status: 400,
            }
        );
    }

    #[test]
    fn error_status_without_envelope_is_not_success() {
        let err = classify_response(502, None, b"{}", false).unwrap_err();
        assert!(matches!(err, SpApiError::Remote { status: 502, .. }));
    }
}
