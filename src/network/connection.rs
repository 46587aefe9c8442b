use std::{fmt, net::SocketAddr, sync::Arc};

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

use crate::error::SendError;

/// Уникальный идентификатор соединения внутри реестра.
pub type ConnectionId = u64;

/// Handle одного живого клиента.
///
/// Запись неблокирующая: текст кладётся в ограниченную очередь, из
/// которой задача-писатель отправляет кадры в сокет. Закрытие через
/// токен одновременно останавливает писателя и цикл чтения.
pub struct ClientConnection {
    id: ConnectionId,
    peer: Option<SocketAddr>,
    tx: mpsc::Sender<Arc<str>>,
    closed: CancellationToken,
}

impl ClientConnection {
    pub fn new(
        id: ConnectionId,
        peer: Option<SocketAddr>,
        tx: mpsc::Sender<Arc<str>>,
    ) -> Self {
        Self {
            id,
            peer,
            tx,
            closed: CancellationToken::new(),
        }
    }

    /// Создаёт соединение вместе с приёмной стороной очереди.
    pub fn channel(
        id: ConnectionId,
        peer: Option<SocketAddr>,
        capacity: usize,
    ) -> (Self, mpsc::Receiver<Arc<str>>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(id, peer, tx), rx)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// Ставит текст в очередь отправки без ожидания.
    ///
    /// # Возвращает
    /// - `Err(SendError::QueueFull)`, если клиент не успевает читать
    /// - `Err(SendError::Closed)`, если соединение закрыто
    pub fn send(
        &self,
        text: Arc<str>,
    ) -> Result<(), SendError> {
        if self.closed.is_cancelled() {
            return Err(SendError::Closed);
        }
        self.tx.try_send(text).map_err(|e| match e {
            TrySendError::Full(_) => SendError::QueueFull,
            TrySendError::Closed(_) => SendError::Closed,
        })
    }

    /// Закрывает соединение. Повторный вызов ничего не делает.
    pub fn close(&self) {
        self.closed.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Future, завершающаяся при закрытии соединения.
    pub fn closed(&self) -> WaitForCancellationFuture<'_> {
        self.closed.cancelled()
    }
}

impl fmt::Debug for ClientConnection {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("ClientConnection")
            .field("id", &self.id)
            .field("peer", &self.peer)
            .field("closed", &self.is_closed())
            .finish()
    }
}
