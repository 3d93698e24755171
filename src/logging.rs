//! Log subscriber setup for hosts.
//!
//! The engine only emits `tracing` events. A host that has no subscriber of
//! its own can call [`init_logging`] once at startup.

use crate::config::LoggingSettings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install a registry with an `EnvFilter` and a fmt layer.
///
/// `RUST_LOG` wins over `settings.filter`. Returns `false` when a global
/// subscriber was already installed, in which case nothing changes.
pub fn init_logging(settings: &LoggingSettings) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.filter))
        .unwrap_or_else(|e| {
            eprintln!("invalid log filter {:?}: {}", settings.filter, e);
            EnvFilter::new(crate::config::DEFAULT_LOG_FILTER)
        });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(settings.with_target))
        .try_init()
        .is_ok()
}
