// src/logging.rs
// =============================================================================
// Sets up tracing.
//
// Logs go to stderr. Stdout is reserved for results (tables, --json,
// --stdout exports) so the output can be piped.
//
// RUST_LOG overrides the default filter, e.g. RUST_LOG=exam_converter=trace
// =============================================================================

use tracing_subscriber::EnvFilter;

pub fn init(verbose: bool) {
    let default_directive = if verbose {
        "exam_converter=debug"
    } else {
        "exam_converter=info"
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    // try_init: a second call (tests, embedding) is harmless
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
