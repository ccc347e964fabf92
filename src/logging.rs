//! Log setup for the binary.
//!
//! Logs go to stderr so `--json` output on stdout stays parseable. `RUST_LOG`
//! overrides the flag-derived filter, except under `--quiet`.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is not set.
pub fn default_directive(verbose: bool, quiet: bool) -> &'static str {
    if quiet {
        "error"
    } else if verbose {
        "postsmith=debug,warn"
    } else {
        "postsmith=info,warn"
    }
}

/// Install the global subscriber. A second call is a no-op.
pub fn init_logging(verbose: bool, quiet: bool) {
    let env_filter = if quiet {
        EnvFilter::new("error")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose, quiet)))
    };

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbose);

    // Already initialized is fine, e.g. when embedded in tests
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init();
}
