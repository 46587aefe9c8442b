use std::io;

use thiserror::Error;

use super::BusError;

/// Фатальные ошибки запуска сервиса.
///
/// Это единственный класс ошибок конвейера событий, который останавливает
/// процесс целиком: всё, что случается после старта, логируется локально.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("message bus is unreachable: {0}")]
    BusUnreachable(#[source] BusError),

    #[error("failed to subscribe {worker}: {source}")]
    Subscribe {
        worker: &'static str,
        #[source]
        source: BusError,
    },

    #[error("failed to bind listener on {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("coordinator was already started")]
    AlreadyStarted,
}
