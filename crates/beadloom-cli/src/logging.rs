use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter. `RUST_LOG` is used when it
/// is unset.
pub const LOG_ENV: &str = "BEADLOOM_LOG";

const DEFAULT_FILTER: &str = "warn";

/// Install the stderr `fmt` subscriber. Safe to call more than once.
pub fn init() {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
