//! Serialization utilities for domain types

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serializer};

/// Serde helpers for `Option<Duration>` stored as milliseconds
///
/// Timeouts and poll intervals are configured in milliseconds, matching the
/// way callers express them in TOML/JSON configuration.
///
/// # Usage
/// ```rust
/// use std::time::Duration;
///
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Example {
///     #[serde(default, with = "spapi_domain::utils::serde::option_duration_millis")]
///     timeout: Option<Duration>,
/// }
/// ```
pub mod option_duration_millis {
    use super::*;

    type SerializeResult<S> = Result<<S as Serializer>::Ok, <S as Serializer>::Error>;

    /// Serialize as milliseconds, or `null` when unset
    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> SerializeResult<S>
    where
        S: Serializer,
    {
        match duration {
            Some(duration) => {
                serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
            }
            None => serializer.serialize_none(),
        }
    }

    /// Deserialize optional milliseconds into a Duration
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = Option::<u64>::deserialize(deserializer)?;
        Ok(millis.map(Duration::from_millis))
    }
}
