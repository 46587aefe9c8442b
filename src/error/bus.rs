use std::time::Duration;

use thiserror::Error;

pub type BusResult<T> = Result<T, BusError>;

/// Ошибки клиента шины сообщений и кэш-хранилища.
#[derive(Debug, Error)]
pub enum BusError {
    #[error("message bus connection is closed")]
    Closed,

    #[error("timed out connecting to the message bus after {0:?}")]
    ConnectTimeout(Duration),

    #[error("invalid subscription pattern: {0}")]
    InvalidPattern(String),

    #[error("unexpected reply from the message bus: {0}")]
    UnexpectedReply(String),

    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

impl From<globset::Error> for BusError {
    fn from(err: globset::Error) -> Self {
        BusError::InvalidPattern(err.to_string())
    }
}
