// Logging
//
// Human-readable tracing output on stderr, plus a JSONL run log that keeps a
// record of every research run and each node that failed.

use tracing_subscriber::EnvFilter;

pub mod run_log;

pub use run_log::{RunEvent, RunLog};

/// Default filter for a `-v` count. RUST_LOG overrides it.
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "obsidian_suite=info,warn",
        1 => "obsidian_suite=debug,info",
        _ => "obsidian_suite=trace,debug",
    }
}

/// Install the global subscriber and bridge `log` records into it.
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_ok() {
        // hyper and rustls log through the `log` facade
        let _ = tracing_log::LogTracer::init();
    }
}
