//! Логирование на базе `tracing-subscriber`.
//!
//! Консольный слой (compact/pretty/json) и необязательный файловый слой
//! с ежедневной ротацией поверх общего `EnvFilter`.

pub mod config;
mod filters;
mod formatter;
pub mod handle;
pub mod sinks;

pub use config::{LogFormat, LoggingConfig};
pub use handle::LoggingHandle;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::LoggingError;

/// Инициализирует глобальный подписчик.
///
/// # Возвращает
/// - `LoggingHandle`, который нужно закрыть через `shutdown` перед
///   выходом из процесса
/// - `LoggingError`, если настройки некорректны или подписчик уже
///   установлен
pub fn init_logging(config: &LoggingConfig) -> Result<LoggingHandle, LoggingError> {
    config.validate()?;
    config.ensure_log_dir()?;

    let env_filter = filters::build_filter_from_config(config);
    let mut layers = Vec::new();
    layers.push(sinks::console::layer(config));

    let file_guard = if config.file_enabled {
        let (file_layer, guard) = sinks::file::layer(config);
        layers.push(file_layer);
        Some(guard)
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layers)
        .try_init()?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        log_level = %config.level,
        format = ?config.format,
        file_enabled = config.file_enabled,
        log_dir = %config.log_dir.display(),
        "Logging system initialized"
    );

    Ok(LoggingHandle::new(file_guard))
}
