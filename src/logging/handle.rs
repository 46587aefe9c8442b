use std::time::Instant;

use tracing_appender::non_blocking::WorkerGuard;

/// Handle для управления жизненным циклом логирования.
///
/// Держит guard файлового writer'а; `shutdown` сбрасывает буфер.
#[derive(Debug)]
pub struct LoggingHandle {
    file_guard: Option<WorkerGuard>,
    shut_down: bool,
}

impl LoggingHandle {
    pub fn new(file_guard: Option<WorkerGuard>) -> Self {
        Self {
            file_guard,
            shut_down: false,
        }
    }

    /// Включён ли файловый вывод.
    pub fn has_file_sink(&self) -> bool {
        self.file_guard.is_some()
    }

    /// Сбрасывает буферы и завершает файловый writer.
    pub fn shutdown(mut self) {
        self.shut_down = true;
        let Some(guard) = self.file_guard.take() else {
            return;
        };

        tracing::info!("Flushing log file");
        let start = Instant::now();
        drop(guard);
        // файловый writer закрыт, событие уйдёт только в консоль
        tracing::debug!(elapsed_ms = start.elapsed().as_millis() as u64, "Log file flushed");
    }
}

impl Drop for LoggingHandle {
    fn drop(&mut self) {
        if !self.shut_down && self.file_guard.is_some() {
            eprintln!(
                "WARNING: LoggingHandle dropped without explicit shutdown(). \
                 Some logs may be lost."
            );
        }
    }
}
