use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use redis::{aio::ConnectionManager, AsyncCommands, Client};
use tokio::{sync::mpsc, task::AbortHandle, time::timeout};
use tracing::{debug, info, warn};

use super::{CacheStore, Message, MessageBus, Subscription};
use crate::error::{BusError, BusResult};

/// Шина сообщений поверх Redis.
///
/// Команды (`PING`, `PUBLISH`, `DEL`) идут через общий
/// [`ConnectionManager`], который сам переподключается. Каждая подписка
/// открывает собственное pub/sub соединение: медленная подписка не
/// задерживает остальные.
///
/// `close` отпускает менеджер и останавливает форвардеры всех ещё
/// открытых подписок: их `recv` после этого возвращает `None`.
pub struct RedisBus {
    client: Client,
    /// `None` после `close`
    manager: Mutex<Option<ConnectionManager>>,
    /// Ёмкость очереди каждой подписки
    subscription_capacity: usize,
    forwarders: ForwarderSet,
}

/// Учёт форвардеров подписок, которые нужно остановить при закрытии шины.
#[derive(Debug)]
struct ForwarderSet {
    /// `None` после `abort_all`
    handles: Mutex<Option<Vec<AbortHandle>>>,
}

impl ForwarderSet {
    fn new() -> Self {
        Self {
            handles: Mutex::new(Some(Vec::new())),
        }
    }

    /// Запоминает форвардер. Завершившиеся форвардеры попутно забываются.
    ///
    /// Если набор уже закрыт, форвардер останавливается сразу.
    fn track(
        &self,
        handle: AbortHandle,
    ) {
        match self.handles.lock().as_mut() {
            Some(handles) => {
                handles.retain(|h| !h.is_finished());
                handles.push(handle);
            }
            None => handle.abort(),
        }
    }

    /// Останавливает все форвардеры и закрывает набор. Идемпотентен.
    ///
    /// # Возвращает
    /// - Количество остановленных форвардеров.
    fn abort_all(&self) -> usize {
        let Some(handles) = self.handles.lock().take() else {
            return 0;
        };
        let mut aborted = 0;
        for handle in handles {
            if !handle.is_finished() {
                handle.abort();
                aborted += 1;
            }
        }
        aborted
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.handles.lock().as_ref().map_or(0, Vec::len)
    }
}

impl RedisBus {
    /// Подключается к Redis по URL вида `redis://host:6379`.
    ///
    /// Недоступность сервера в течение `connect_timeout` считается ошибкой.
    pub async fn connect(
        url: &str,
        connect_timeout: Duration,
        subscription_capacity: usize,
    ) -> BusResult<Self> {
        let client = Client::open(url)?;
        let manager = timeout(connect_timeout, client.get_connection_manager())
            .await
            .map_err(|_| BusError::ConnectTimeout(connect_timeout))??;

        info!(url, "Connected to Redis");

        Ok(Self {
            client,
            manager: Mutex::new(Some(manager)),
            subscription_capacity: subscription_capacity.max(1),
            forwarders: ForwarderSet::new(),
        })
    }

    fn connection(&self) -> BusResult<ConnectionManager> {
        self.manager.lock().clone().ok_or(BusError::Closed)
    }

    /// Запускает форвардер поверх подготовленного pub/sub соединения.
    fn spawn_forwarder(
        &self,
        label: String,
        pubsub: redis::aio::PubSub,
    ) -> Subscription {
        let (tx, rx) = mpsc::channel(self.subscription_capacity);
        let forwarder_label = label.clone();

        let forwarder = tokio::spawn(async move {
            let mut stream = pubsub.into_on_message();
            while let Some(msg) = stream.next().await {
                let payload: String = match msg.get_payload() {
                    Ok(payload) => payload,
                    Err(e) => {
                        warn!(
                            channel = msg.get_channel_name(),
                            error = %e,
                            "Dropping non-text pub/sub payload"
                        );
                        continue;
                    }
                };
                if tx
                    .send(Message::new(msg.get_channel_name(), payload))
                    .await
                    .is_err()
                {
                    break;
                }
            }
            debug!(subscription = %forwarder_label, "Redis pub/sub stream ended");
        });
        self.forwarders.track(forwarder.abort_handle());

        Subscription::new(label, rx, vec![forwarder])
    }
}

#[async_trait]
impl MessageBus for RedisBus {
    async fn ping(&self) -> BusResult<()> {
        let mut conn = self.connection()?;
        let reply: String = redis::cmd("PING").query_async(&mut conn).await?;
        if reply != "PONG" {
            return Err(BusError::UnexpectedReply(reply));
        }
        Ok(())
    }

    async fn subscribe(
        &self,
        channels: &[&str],
    ) -> BusResult<Subscription> {
        self.connection()?;
        let mut pubsub = self.client.get_async_pubsub().await?;
        for channel in channels {
            pubsub.subscribe(*channel).await?;
        }
        Ok(self.spawn_forwarder(channels.join(","), pubsub))
    }

    async fn psubscribe(
        &self,
        pattern: &str,
    ) -> BusResult<Subscription> {
        self.connection()?;
        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.psubscribe(pattern).await?;
        Ok(self.spawn_forwarder(pattern.to_string(), pubsub))
    }

    async fn publish(
        &self,
        channel: &str,
        payload: &str,
    ) -> BusResult<usize> {
        let mut conn = self.connection()?;
        let receivers: usize = conn.publish(channel, payload).await?;
        Ok(receivers)
    }

    /// Отпускает командное соединение и останавливает форвардеры
    /// открытых подписок вместе с их pub/sub соединениями.
    async fn close(&self) -> BusResult<()> {
        let manager = self.manager.lock().take();
        let aborted = self.forwarders.abort_all();
        if manager.is_some() {
            info!(subscriptions = aborted, "Redis client closed");
        }
        Ok(())
    }
}

#[async_trait]
impl CacheStore for RedisBus {
    async fn delete(
        &self,
        key: &str,
    ) -> BusResult<bool> {
        let mut conn = self.connection()?;
        let removed: usize = conn.del(key).await?;
        Ok(removed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Проверяет, что некорректный URL отклоняется до попытки подключения.
    #[tokio::test]
    async fn test_connect_rejects_invalid_url() {
        let res = RedisBus::connect("not a url", Duration::from_millis(50), 8).await;
        assert!(matches!(res, Err(BusError::Redis(_))));
    }

    /// Проверяет, что недоступный сервер даёт ошибку, а не зависание.
    #[tokio::test]
    async fn test_connect_unreachable_server_fails() {
        let res = RedisBus::connect("redis://127.0.0.1:1/", Duration::from_millis(500), 8).await;
        assert!(res.is_err());
    }

    /// Проверяет, что `abort_all` останавливает форвардеры, а подписки
    /// поверх них завершаются через `recv() -> None`.
    #[tokio::test]
    async fn test_forwarder_set_abort_ends_subscriptions() {
        let set = ForwarderSet::new();
        let mut subs = Vec::new();
        for i in 0..2 {
            let (tx, rx) = mpsc::channel::<Message>(1);
            let forwarder = tokio::spawn(async move {
                let _tx = tx;
                std::future::pending::<()>().await;
            });
            set.track(forwarder.abort_handle());
            subs.push(Subscription::new(format!("sub-{i}"), rx, vec![forwarder]));
        }
        assert_eq!(set.len(), 2);

        assert_eq!(set.abort_all(), 2);
        assert_eq!(set.abort_all(), 0);
        for sub in &mut subs {
            let next = timeout(Duration::from_secs(1), sub.recv()).await.unwrap();
            assert!(next.is_none());
        }
    }

    /// Форвардер, появившийся после закрытия, останавливается сразу.
    #[tokio::test]
    async fn test_forwarder_set_track_after_close_aborts() {
        let set = ForwarderSet::new();
        set.abort_all();

        let late = tokio::spawn(std::future::pending::<()>());
        set.track(late.abort_handle());
        assert_eq!(set.len(), 0);
        assert!(late.await.unwrap_err().is_cancelled());
    }

    /// Завершившиеся форвардеры не накапливаются.
    #[tokio::test]
    async fn test_forwarder_set_prunes_finished() {
        let set = ForwarderSet::new();
        let done = tokio::spawn(async {});
        let handle = done.abort_handle();
        done.await.unwrap();
        set.track(handle);

        let pending = tokio::spawn(std::future::pending::<()>());
        set.track(pending.abort_handle());
        assert_eq!(set.len(), 1);
        assert_eq!(set.abort_all(), 1);
    }
}
