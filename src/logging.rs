//! Logging init for the CLI: structured events to stderr, filtered by `RUST_LOG`.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,progress_fetch=debug";

/// Initialize logging to stderr so log lines never mix with a body printed on stdout.
/// `quiet` drops the default level to warnings; an explicit `RUST_LOG` always wins.
pub fn init_logging(quiet: bool) {
    let default = if quiet { "warn" } else { DEFAULT_FILTER };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
