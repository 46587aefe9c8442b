use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{layer::Layer as LayerTrait, registry::LookupSpan};

use crate::logging::{config::LoggingConfig, formatter};

/// Файловый слой с ежедневной ротацией и неблокирующей записью.
///
/// Guard нужно держать до конца работы процесса: при его `Drop`
/// буфер сбрасывается на диск.
pub fn layer<S>(config: &LoggingConfig) -> (Box<dyn LayerTrait<S> + Send + Sync>, WorkerGuard)
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    let appender = rolling::daily(&config.log_dir, &config.file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let layer = formatter::build_formatter(config.format, writer, false, config.with_target);
    (layer, guard)
}
