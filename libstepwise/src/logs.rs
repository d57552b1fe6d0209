use eyre::{Result, WrapErr};
use tracing_subscriber::EnvFilter;

/// `RUST_LOG` when it is set, `default_filter` otherwise.
fn env_filter(default_filter: &str) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(default_filter)
            .wrap_err_with(|| format!("Invalid log filter '{default_filter}'")),
    }
}

/// Install the global subscriber, printing events to stderr.
///
/// `default_filter` is typically [`crate::config::LogConfig::filter`].
#[cfg(not(target_arch = "wasm32"))]
pub fn start_logging(default_filter: &str) -> Result<()> {
    use std::io::stderr;

    use tracing_subscriber::{Layer, Registry, fmt, layer::SubscriberExt};

    let filter = env_filter(default_filter)?;
    let subscriber = Registry::default().with(
        fmt::layer()
            .without_time()
            .with_writer(stderr)
            .with_filter(filter),
    );

    tracing::subscriber::set_global_default(subscriber)
        .wrap_err("Unable to set global subscriber")?;

    Ok(())
}
