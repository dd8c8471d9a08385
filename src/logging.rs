//! Tracing subscriber setup for hosts embedding the pipeline.
//!
//! The library only emits `tracing` events; installing a subscriber is the
//! host's call. `init_tracing` is a convenience for hosts and tests that
//! want the usual fmt output.

use tracing_subscriber::EnvFilter;

/// Default directive when `RUST_LOG` is not set.
pub const DEFAULT_DIRECTIVE: &str = "answer_stream=info";

/// Install a global fmt subscriber filtered by `RUST_LOG`, falling back to
/// `default_directive`.
///
/// Returns false when a global subscriber was already installed, so calling
/// it more than once is harmless.
pub fn init_tracing(default_directive: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_line_number(true)
        .try_init()
        .is_ok()
}

/// Like [`init_tracing`] with output captured by the test harness.
pub fn init_test_tracing() -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("answer_stream=debug"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init()
        .is_ok()
}
