//! Logging setup

use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber, writing to stderr so command
/// output on stdout stays machine-readable.
///
/// `RUST_LOG` takes precedence; otherwise only errors are shown, or
/// everything down to `debug` for this crate when `verbose` is set.
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("freelance_ledger=debug,sqlx=warn")
        } else {
            EnvFilter::new("error")
        }
    });

    // A subscriber may already be installed (e.g. by a test harness).
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
