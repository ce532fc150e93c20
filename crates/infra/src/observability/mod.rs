//! Logging setup
//!
//! The library only emits `tracing` events. Binaries and tests that want to
//! see them call [`init_tracing`] once at startup.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Output format of the installed subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Directive used when `RUST_LOG` is unset.
pub fn default_directive(debug_log: bool) -> &'static str {
    if debug_log {
        "spapi_infra=debug,spapi_core=debug,info"
    } else {
        "info"
    }
}

/// Install a global fmt subscriber honouring `RUST_LOG`.
///
/// Returns `false` when a global subscriber was already installed, in which
/// case the existing one is left in place.
pub fn init_tracing(debug_log: bool) -> bool {
    init_tracing_with(debug_log, LogFormat::Pretty)
}

pub fn init_tracing_with(debug_log: bool, format: LogFormat) -> bool {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(debug_log)));

    let registry = tracing_subscriber::registry().with(env_filter);
    let installed = match format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init(),
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).try_init(),
    };

    match installed {
        Ok(()) => {
            tracing::debug!(debug_log, ?format, "Tracing initialized");
            true
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_log_widens_the_default_filter() {
        assert_eq!(default_directive(false), "info");
        assert!(default_directive(true).contains("spapi_infra=debug"));
    }

    #[test]
    fn second_initialisation_is_a_no_op() {
        let _ = init_tracing(false);
        assert!(!init_tracing_with(true, LogFormat::Json));
    }
}
