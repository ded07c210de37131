//! Structured logging setup.
//!
//! The core itself never configures a subscriber implicitly — `init_tracing`
//! is an opt-in convenience for binaries and tests that want a sensible
//! default (env-filter driven, ANSI when attached to a terminal) without
//! hand-assembling a `tracing_subscriber::fmt` layer.

use tracing_subscriber::EnvFilter;

/// Installs a global `tracing` subscriber reading `RUST_LOG` (defaulting to
/// `info`). Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
