use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "FITLOG_LOG";

/// Installs the stderr subscriber. `FITLOG_LOG` wins over the configured
/// filter. Calling this twice is harmless.
pub fn init(configured: &str) {
    let filter = std::env::var(LOG_ENV)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| configured.to_string());
    let filter = EnvFilter::try_new(&filter).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
