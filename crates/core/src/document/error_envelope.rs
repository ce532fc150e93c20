//! Decoding of failed document transfer responses
//!
//! Pre-signed storage URLs report failures as an XML `<Error>` envelope, but
//! proxies and gateways may answer with the API's JSON `errors` envelope or
//! plain text. Decoders run in a fixed order and the first match wins.

use serde_json::Value;
use spapi_domain::{normalize_error_code, SpApiError};

use super::charset;
use super::transcode::xml_to_value;

/// Code used when the body carries no recognizable error envelope.
pub const UNSTRUCTURED_ERROR_CODE: &str = "DOCUMENT_TRANSFER_FAILED";

/// `(code, message)` extracted from an error body.
type Decoded = (String, String);

type Decoder = fn(&str) -> Option<Decoded>;

const DECODERS: &[Decoder] = &[xml_envelope, json_envelope];

fn xml_envelope(body: &str) -> Option<Decoded> {
    if !body.trim_start().starts_with('<') {
        return None;
    }
    let parsed = xml_to_value(body).ok()?;
    let error = parsed.get("Error")?;
    let field = |name: &str| error.get(name).and_then(Value::as_str).map(str::to_string);
    let code = field("Code")?;
    Some((code, field("Message").unwrap_or_default()))
}

fn json_envelope(body: &str) -> Option<Decoded> {
    let parsed: Value = serde_json::from_str(body).ok()?;
    let error = parsed.get("errors")?.as_array()?.first()?;
    let field = |name: &str| error.get(name).and_then(Value::as_str).map(str::to_string);
    let code = field("code")?;
    let message = field("message").or_else(|| field("details")).unwrap_or_default();
    Some((code, message))
}

/// Build the error for a non-200 document transfer response.
pub fn decode_error(status: u16, body: &[u8], content_type: Option<&str>) -> SpApiError {
    let text = charset::decode_lossy(body, content_type);
    let (code, message) = DECODERS
        .iter()
        .find_map(|decoder| decoder(&text))
        .map(|(code, message)| (normalize_error_code(&code), message))
        .unwrap_or_else(|| (UNSTRUCTURED_ERROR_CODE.to_string(), text.trim().to_string()));
    SpApiError::Remote { code, message, details: None, status }
}
