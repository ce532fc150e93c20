//! Charset detection and text decoding

use encoding_rs::Encoding;
use once_cell::sync::Lazy;
use regex::Regex;
use spapi_domain::constants::DEFAULT_CHARSET;
use spapi_domain::{Result, SpApiError};

static CHARSET_PARAM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)charset\s*=\s*"?([^";\s]+)"?"#).expect("CHARSET_PARAM regex should compile")
});

/// The `charset` parameter of a content type, if any.
pub fn from_content_type(content_type: &str) -> Option<String> {
    CHARSET_PARAM
        .captures(content_type)
        .and_then(|captures| captures.get(1))
        .map(|charset| charset.as_str().to_string())
}

/// Charset to use: caller override, then the content type, then UTF-8.
pub fn select(explicit: Option<&str>, content_type: Option<&str>) -> String {
    explicit
        .map(str::to_string)
        .or_else(|| content_type.and_then(from_content_type))
        .unwrap_or_else(|| DEFAULT_CHARSET.to_string())
}

fn lookup(charset: &str) -> Result<&'static Encoding> {
    Encoding::for_label(charset.trim().as_bytes())
        .ok_or_else(|| SpApiError::Decode { charset: charset.to_string() })
}

/// Decode bytes with the given charset, replacing malformed sequences.
///
/// # Errors
/// Returns `Decode` if the charset label is not supported.
pub fn decode(bytes: &[u8], charset: &str) -> Result<String> {
    let encoding = lookup(charset)?;
    let (text, _, _) = encoding.decode(bytes);
    Ok(text.into_owned())
}

/// Best-effort decoding used for error bodies: never fails.
pub fn decode_lossy(bytes: &[u8], content_type: Option<&str>) -> String {
    let charset = select(None, content_type);
    decode(bytes, &charset).unwrap_or_else(|_| String::from_utf8_lossy(bytes).into_owned())
}

/// Encode text in the given charset.
///
/// # Errors
/// Returns `Decode` if the charset label is not supported.
pub fn encode(text: &str, charset: &str) -> Result<Vec<u8>> {
    let encoding = lookup(charset)?;
    let (bytes, _, _) = encoding.encode(text);
    Ok(bytes.into_owned())
}

/// Check that `bytes` are well-formed in `charset`.
///
/// # Errors
/// Returns `Decode` for unsupported charsets or malformed content.
pub fn validate(bytes: &[u8], charset: &str) -> Result<()> {
    let encoding = lookup(charset)?;
    encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(|_| ())
        .ok_or_else(|| SpApiError::Decode { charset: charset.to_string() })
}
