//! Response-side types

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{Result, SpApiError};

/// Unprocessed HTTP exchange result, returned when `raw_result` is requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

impl RawResponse {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Body as text, replacing invalid UTF-8 sequences.
    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Successful outcome of an API call.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse {
    /// Decoded payload (or the whole body for unwrapped operations)
    Payload(Value),
    /// HTTP 204: success without a body
    NoContent,
    /// `raw_result` passthrough
    Raw(RawResponse),
}

impl ApiResponse {
    pub fn payload(&self) -> Option<&Value> {
        match self {
            Self::Payload(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_payload(self) -> Option<Value> {
        match self {
            Self::Payload(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_no_content(&self) -> bool {
        matches!(self, Self::NoContent)
    }

    /// Deserialize the payload into `T`.
    ///
    /// A 204 response deserializes from `null`, so `()` and `Option<_>`
    /// targets accept it.
    ///
    /// # Errors
    /// Returns `SpApiError::Parse` if the payload does not match `T`, or if
    /// this is a raw response.
    pub fn deserialize<T: DeserializeOwned>(self) -> Result<T> {
        let value = match self {
            Self::Payload(value) => value,
            Self::NoContent => Value::Null,
            Self::Raw(raw) => {
                return Err(SpApiError::Parse(format!(
                    "raw response (status {}) cannot be deserialized as a payload",
                    raw.status
                )))
            }
        };
        serde_json::from_value(value)
            .map_err(|e| SpApiError::Parse(format!("payload does not match expected type: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Created {
        #[serde(rename = "reportId")]
        report_id: String,
    }

    #[test]
    fn payload_deserializes_into_typed_value() {
        let response = ApiResponse::Payload(json!({ "reportId": "R-1" }));
        let created: Created = response.deserialize().unwrap();
        assert_eq!(created, Created { report_id: "R-1".into() });
    }

    #[test]
    fn no_content_deserializes_into_unit() {
        assert!(ApiResponse::NoContent.is_no_content());
        let unit: () = ApiResponse::NoContent.deserialize().unwrap();
        assert_eq!(unit, ());
    }

    #[test]
    fn raw_header_lookup_ignores_case() {
        let mut headers = BTreeMap::new();
        headers.insert("x-amzn-RateLimit-Limit".to_string(), "0.5".to_string());
        let raw = RawResponse { status: 200, headers, body: b"{}".to_vec() };
        assert_eq!(raw.header("x-amzn-ratelimit-limit"), Some("0.5"));
        assert!(ApiResponse::Raw(raw).deserialize::<Value>().is_err());
    }
}
