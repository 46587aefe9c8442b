//! Контракт шины сообщений (publish/subscribe) и кэш-хранилища.
//!
//! Конвейер событий использует шину только через два трейта:
//!
//! - [`MessageBus`]: ping, подписка на точные каналы, подписка по шаблону,
//!   публикация и закрытие соединения.
//! - [`CacheStore`]: удаление производных ключей кэша.
//!
//! ## Реализации
//!
//! - `redis`: рабочая реализация поверх Redis (`ConnectionManager` для команд,
//!   отдельное pub/sub соединение на каждую подписку).
//! - `memory`: внутрипроцессный брокер с точными и glob-подписками и простым
//!   keyspace. Используется в тестах и в режиме `--bus memory`.

pub mod memory;
mod message;
pub mod redis;
mod subscription;

use async_trait::async_trait;

pub use self::{memory::MemoryBus, message::Message, redis::RedisBus, subscription::Subscription};

use crate::error::BusResult;

/// Клиент шины сообщений.
///
/// Реализации обязаны быть безопасными для одновременного использования
/// несколькими подписчиками и издателями без внешней блокировки.
#[async_trait]
pub trait MessageBus: Send + Sync {
    /// Проверяет доступность шины.
    async fn ping(&self) -> BusResult<()>;

    /// Подписка на набор каналов (точное совпадение имени).
    async fn subscribe(
        &self,
        channels: &[&str],
    ) -> BusResult<Subscription>;

    /// Подписка по glob-шаблону, например `"confessions:*"`.
    async fn psubscribe(
        &self,
        pattern: &str,
    ) -> BusResult<Subscription>;

    /// Публикует сообщение в канал.
    ///
    /// # Возвращает
    /// - Количество подписок, получивших сообщение.
    async fn publish(
        &self,
        channel: &str,
        payload: &str,
    ) -> BusResult<usize>;

    /// Закрывает клиент. Активные подписки завершаются.
    async fn close(&self) -> BusResult<()>;
}

/// Внешнее кэш-хранилище, из которого конвейер удаляет ключи.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Удаляет ключ.
    ///
    /// # Возвращает
    /// - `true`, если ключ существовал
    async fn delete(
        &self,
        key: &str,
    ) -> BusResult<bool>;
}
