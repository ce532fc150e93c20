//! Macro for implementing Display and FromStr for wire-level enums
//!
//! HTTP methods, regions and report processing statuses all travel as fixed
//! string literals. This macro maps each variant to its literal once and
//! derives both directions from that table.
//!
//! # Example
//!
//! ```rust
//! use spapi_domain::impl_wire_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum FeedStatus {
//!     InQueue,
//!     Done,
//! }
//!
//! impl_wire_conversions!(FeedStatus {
//!     InQueue => "IN_QUEUE",
//!     Done => "DONE",
//! });
//!
//! assert_eq!(FeedStatus::Done.to_string(), "DONE");
//! assert_eq!("in_queue".parse::<FeedStatus>(), Ok(FeedStatus::InQueue));
//! ```

/// Implements Display and FromStr for enums with a fixed wire literal
///
/// - Display writes the literal exactly as declared
/// - FromStr compares ASCII case-insensitively
/// - Parse failures return a message naming the enum and the input
#[macro_export]
macro_rules! impl_wire_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl $enum_name {
            /// Wire literal for this variant.
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $str,)+
                }
            }
        }

        impl ::std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                $(
                    if s.eq_ignore_ascii_case($str) {
                        return Ok(Self::$variant);
                    }
                )+
                Err(format!("Invalid {}: {}", stringify!($enum_name), s))
            }
        }
    };
}
