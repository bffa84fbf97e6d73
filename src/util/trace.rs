//! Structured tracing of matches, using `tracing_subscriber`.
//!
//! Spans are emitted for every match and routing search, filtered by
//! the `RUST_LOG` environment variable:
//! ```bash
//! RUST_LOG=pathsnap=debug
//! ```

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Initialises the tracer, writing to stdout.
/// This is optional, not calling this function will simply
/// not log traces.
pub fn initialize_tracer() {
    let fmt_layer = tracing_subscriber::fmt::layer();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(fmt_layer)
        .init();
}
