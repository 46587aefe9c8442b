use thiserror::Error;

/// Ошибка неблокирующей записи в исходящую очередь соединения.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SendError {
    #[error("outbound queue is full")]
    QueueFull,

    #[error("connection is closed")]
    Closed,
}
