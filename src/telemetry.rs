use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,tower_http=debug";

/// Installs the global `fmt` subscriber. `RUST_LOG` overrides the default filter.
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    if tracing_subscriber::fmt().with_env_filter(filter).try_init().is_err() {
        tracing::warn!("tracing subscriber already installed");
    }
}
