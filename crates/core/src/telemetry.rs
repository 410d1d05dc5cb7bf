use tracing_subscriber::EnvFilter;

/// Install the stderr tracing subscriber used by every binary. `RUST_LOG`
/// wins over `default_filter`; stdout stays reserved for tool output.
pub fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    // A second init (e.g. from tests) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
