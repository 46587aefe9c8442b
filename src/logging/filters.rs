use tracing_subscriber::EnvFilter;

use super::config::LoggingConfig;

/// Строит фильтр: `RUST_LOG`, если задан, иначе директива из настроек.
pub fn build_filter_from_config(config: &LoggingConfig) -> EnvFilter {
    let directive = config.build_filter_directive();

    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&directive))
        .unwrap_or_else(|e| {
            // подписчика ещё нет, поэтому только stderr
            eprintln!("Invalid log filter directive '{directive}': {e}; falling back to 'info'");
            EnvFilter::new("info")
        })
}
