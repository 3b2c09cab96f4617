//! Tracing setup for tests and benches. Never called by library code itself
//! — only binaries/tests/benches decide how (and whether) to subscribe.

use tracing_subscriber::EnvFilter;

/// Installs a `tracing-subscriber` fmt subscriber reading `RUST_LOG`
/// (defaulting to `info`), ignoring the error if a subscriber is already
/// installed (harmless when called from more than one test in a binary).
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_test_writer().try_init();
}
