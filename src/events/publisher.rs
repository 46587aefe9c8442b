use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::EventChannel;
use crate::bus::MessageBus;

/// Издатель событий для обработчиков записи.
///
/// Публикация асинхронна и не подтверждается: обработчик запроса не
/// ждёт шину, ошибки только логируются. Доставка не гарантируется,
/// повторов нет.
#[derive(Clone)]
pub struct EventPublisher {
    bus: Arc<dyn MessageBus>,
}

impl EventPublisher {
    pub fn new(bus: Arc<dyn MessageBus>) -> Self {
        Self { bus }
    }

    /// Сериализует событие в JSON и публикует его в фоне.
    ///
    /// # Возвращает
    /// - `Some(JoinHandle)` фоновой публикации
    /// - `None`, если событие не удалось сериализовать
    pub fn publish<T: Serialize>(
        &self,
        channel: EventChannel,
        event: &T,
    ) -> Option<JoinHandle<()>> {
        match serde_json::to_string(event) {
            Ok(payload) => Some(self.publish_raw(channel, payload)),
            Err(e) => {
                warn!(channel = %channel, error = %e, "Failed to serialize event, not published");
                None
            }
        }
    }

    /// Публикует готовый payload в фоне.
    pub fn publish_raw(
        &self,
        channel: EventChannel,
        payload: String,
    ) -> JoinHandle<()> {
        let bus = Arc::clone(&self.bus);
        tokio::spawn(async move {
            match bus.publish(channel.as_str(), &payload).await {
                Ok(receivers) => debug!(channel = %channel, receivers, "Event published"),
                Err(e) => warn!(channel = %channel, error = %e, "Failed to publish event"),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::timeout;

    use super::*;
    use crate::{
        bus::MemoryBus,
        events::{CommentEvent, NAMESPACE_PATTERN},
    };

    #[tokio::test]
    async fn test_publish_serializes_and_delivers() {
        let bus = Arc::new(MemoryBus::new(8));
        let mut sub = bus.psubscribe(NAMESPACE_PATTERN).await.unwrap();
        let publisher = EventPublisher::new(bus.clone());

        let event = CommentEvent {
            id: "c1".into(),
            confession_id: "x1".into(),
        };
        publisher
            .publish(EventChannel::CommentCreated, &event)
            .unwrap()
            .await
            .unwrap();

        let msg = timeout(Duration::from_millis(200), sub.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&*msg.channel, "confessions:comment:created");
        assert_eq!(msg.payload, r#"{"id":"c1","confession_id":"x1"}"#);
    }

    /// Ошибка шины не всплывает к вызывающему.
    #[tokio::test]
    async fn test_publish_on_closed_bus_is_swallowed() {
        let bus = Arc::new(MemoryBus::new(8));
        bus.close().await.unwrap();
        let publisher = EventPublisher::new(bus);

        let handle = publisher.publish_raw(EventChannel::ConfessionCreated, "{}".into());
        assert!(handle.await.is_ok());
    }
}
