use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
};

use parking_lot::Mutex;
use tracing::{debug, info};

use super::connection::{ClientConnection, ConnectionId};

/// Реестр живых клиентских соединений.
///
/// Весь набор защищён одной эксклюзивной блокировкой, через которую
/// проходят все операции. `broadcast` держит её на время всего прохода:
/// запись в соединение неблокирующая, а набор ожидается небольшим.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    /// Хранилище соединений: connection_id -> ClientConnection
    connections: Mutex<HashMap<ConnectionId, Arc<ClientConnection>>>,
    /// Счётчик для генерации уникальных ID
    id_counter: AtomicU64,
    /// Выставляется в `shutdown`; новые соединения после него не принимаются
    shut_down: AtomicBool,
}

/// Итог одного прохода `broadcast`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Соединений, получивших сообщение.
    pub delivered: usize,
    /// Соединений, закрытых и удалённых из-за ошибки записи.
    pub dropped: usize,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl ConnectionRegistry {
    /// Создаёт новый пустой реестр.
    pub fn new() -> Self {
        Self::default()
    }

    /// Выдаёт новый ID соединения.
    pub fn next_id(&self) -> ConnectionId {
        self.id_counter.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Добавляет соединение.
    ///
    /// # Возвращает
    /// - `true`, если соединение добавлено
    /// - `false`, если соединение с таким ID уже есть или реестр закрыт
    ///   (во втором случае соединение сразу закрывается)
    pub fn add(
        &self,
        conn: Arc<ClientConnection>,
    ) -> bool {
        let mut connections = self.connections.lock();
        if self.shut_down.load(Ordering::Acquire) {
            conn.close();
            return false;
        }
        if connections.contains_key(&conn.id()) {
            return false;
        }
        connections.insert(conn.id(), conn);
        true
    }

    /// Удаляет соединение из реестра.
    ///
    /// # Примечание
    /// Если `connection_id` отсутствует, метод ничего не делает.
    pub fn remove(
        &self,
        connection_id: ConnectionId,
    ) -> bool {
        self.connections.lock().remove(&connection_id).is_some()
    }

    /// Возвращает количество активных соединений.
    pub fn count(&self) -> usize {
        self.connections.lock().len()
    }

    /// Проверяет, зарегистрировано ли соединение.
    pub fn contains(
        &self,
        connection_id: ConnectionId,
    ) -> bool {
        self.connections.lock().contains_key(&connection_id)
    }

    /// Отправляет `message` каждому зарегистрированному соединению.
    ///
    /// Соединение, запись в которое не удалась, закрывается и удаляется
    /// в этом же проходе. Ошибка не возвращается вызывающему: для
    /// реестра это обычное отключение клиента.
    pub fn broadcast(
        &self,
        message: &str,
    ) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        let mut connections = self.connections.lock();
        if connections.is_empty() {
            return report;
        }

        let text: Arc<str> = Arc::from(message);
        connections.retain(|id, conn| match conn.send(Arc::clone(&text)) {
            Ok(()) => {
                report.delivered += 1;
                true
            }
            Err(e) => {
                debug!(connection_id = id, error = %e, "Dropping client after failed write");
                conn.close();
                report.dropped += 1;
                false
            }
        });

        report
    }

    /// Закрывает и удаляет все соединения. Идемпотентен.
    ///
    /// # Возвращает
    /// - Количество закрытых соединений.
    pub fn shutdown(&self) -> usize {
        let mut connections = self.connections.lock();
        self.shut_down.store(true, Ordering::Release);

        let closed = connections.len();
        for (_, conn) in connections.drain() {
            conn.close();
        }
        if closed > 0 {
            info!(closed, "Closed all client connections");
        }
        closed
    }

    /// Проверяет, был ли вызван `shutdown`.
    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
