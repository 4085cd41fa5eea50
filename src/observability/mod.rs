//! Tracing subscriber setup for embedding applications and tests.
//!
//! The library only emits `tracing` events; installing a subscriber is the
//! caller's choice. Stage spans are `risk.aggregate`, `coverage.map`,
//! `recommendations.generate` and `collector.run`.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::EnvFilter;

fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Install a compact stderr subscriber as the global default.
///
/// `RUST_LOG` overrides the level; otherwise `info`, or `trace` when `verbose`.
/// Fails if a global subscriber is already set.
pub fn init_tracing(verbose: bool) -> Result<(), TryInitError> {
    let filter = env_filter(if verbose { "trace" } else { "info" });
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .try_init()
}

/// Subscriber for tests; safe to call from every test.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::registry()
        .with(env_filter("debug"))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_test_writer()
                .compact(),
        )
        .try_init();
}
