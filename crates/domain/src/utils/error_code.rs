//! Normalization of remote CamelCase error codes
//!
//! Remote errors arrive as `InvalidInput`, `QuotaExceeded`, ... and are
//! surfaced as `INVALID_INPUT`, `QUOTA_EXCEEDED`, ... so callers can match on
//! one stable style.

/// Convert a CamelCase code to SCREAMING_SNAKE_CASE.
///
/// An underscore is inserted before every uppercase letter that is not the
/// first character. Input without lowercase letters is treated as already
/// normalized and only upper-cased, which keeps the function idempotent.
pub fn normalize_error_code(code: &str) -> String {
    if !code.chars().any(char::is_lowercase) {
        return code.to_uppercase();
    }

    let mut normalized = String::with_capacity(code.len() + 8);
    for (index, ch) in code.chars().enumerate() {
        if ch.is_uppercase() && index > 0 && !normalized.ends_with('_') {
            normalized.push('_');
        }
        normalized.extend(ch.to_uppercase());
    }
    normalized
}
