//! Diagnostic logging setup
//!
//! The library only emits `tracing` events. Drivers that want them printed
//! call [`init_logging`] once at startup.

use crate::constants::{LOG_FILTER_ENV, LOG_VERBOSE_ENV};
use std::sync::OnceLock;
use tracing_subscriber::EnvFilter;

static LOGGER: OnceLock<()> = OnceLock::new();

fn default_directive() -> &'static str {
    let verbose = std::env::var(LOG_VERBOSE_ENV)
        .map(|v| v == "1")
        .unwrap_or(false);
    if verbose {
        "debug"
    } else {
        "info"
    }
}

/// Install a stderr `tracing` subscriber.
///
/// The filter comes from `FLEETPROBE_LOG` when set, otherwise `info`
/// (`debug` with `FLEETPROBE_LOG_VERBOSE=1`). Safe to call more than once;
/// a subscriber installed elsewhere is left in place.
pub fn init_logging() {
    LOGGER.get_or_init(|| {
        let filter = EnvFilter::try_from_env(LOG_FILTER_ENV)
            .unwrap_or_else(|_| EnvFilter::new(default_directive()));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    });
}
