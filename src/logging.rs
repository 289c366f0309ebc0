use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "agentstream=info";

/// Installs the global subscriber. Logs go to stderr so stdout stays free
/// for console events.
pub fn init(log_json: bool) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    if log_json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(layer.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(layer)
            .init();
    }
}
