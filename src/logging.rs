//! Ambient tracing setup for examples and tests. The library itself only
//! emits `tracing` events (see `net`, `extractor`, `allocator`); it never
//! installs a subscriber, since that decision belongs to the binary or
//! test harness consuming this crate.

/// Installs a `fmt` subscriber reading `RUST_LOG` (default `info`).
/// Intended for examples/tests; safe to call more than once, only the
/// first call wins.
pub fn init_test_logging() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_test_writer()
        .try_init();
}
