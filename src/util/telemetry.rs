//! Tracing setup for embedders and tests.
//!
//! The scheduler only emits `tracing` events; installing a subscriber is up
//! to the embedder. These helpers cover the common cases.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "taskq_scheduler=info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install a fmt subscriber filtered by `RUST_LOG` unless one is already set.
pub fn init_tracing() {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let _ = tracing_subscriber::fmt().with_env_filter(env_filter()).try_init();
}

/// Like [`init_tracing`] but writes through the test harness so output is
/// captured per test. Safe to call from every test.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_test_writer()
        .try_init();
}
