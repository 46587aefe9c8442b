use std::{
    str::FromStr,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    bus::{CacheStore, Message, Subscription},
    events::{keys, EventChannel, PayloadFields},
};

/// Почему событие не привело к удалению ключей.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Канал не входит в таксономию.
    UnknownChannel,
    /// Payload не разобран или в нём нет нужного поля.
    MalformedPayload,
}

/// Счётчики диспетчера.
#[derive(Debug, Default)]
pub struct InvalidationStats {
    received: AtomicU64,
    /// Сообщений, обработка которых завершена (включая пропущенные)
    handled: AtomicU64,
    deleted: AtomicU64,
    delete_failures: AtomicU64,
    malformed: AtomicU64,
    unhandled: AtomicU64,
}

/// Снимок [`InvalidationStats`] на момент вызова.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub received: u64,
    pub handled: u64,
    pub deleted: u64,
    pub delete_failures: u64,
    pub malformed: u64,
    pub unhandled: u64,
}

impl InvalidationStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            received: self.received.load(Ordering::Relaxed),
            handled: self.handled.load(Ordering::Acquire),
            deleted: self.deleted.load(Ordering::Relaxed),
            delete_failures: self.delete_failures.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            unhandled: self.unhandled.load(Ordering::Relaxed),
        }
    }
}

/// Переводит события записи в удаление производных ключей кэша.
///
/// Ошибки разбора и удаления не останавливают цикл: событие
/// пропускается, причина логируется и учитывается в счётчиках.
#[derive(Clone)]
pub struct InvalidationDispatcher {
    cache: Arc<dyn CacheStore>,
    stats: Arc<InvalidationStats>,
}

impl InvalidationDispatcher {
    pub fn new(cache: Arc<dyn CacheStore>) -> Self {
        Self {
            cache,
            stats: Arc::new(InvalidationStats::default()),
        }
    }

    /// Каналы, на которые подписывается диспетчер.
    pub fn channels() -> Vec<&'static str> {
        EventChannel::all()
    }

    pub fn stats(&self) -> Arc<InvalidationStats> {
        Arc::clone(&self.stats)
    }

    /// Вычисляет ключи кэша, которые нужно удалить для события.
    ///
    /// # Возвращает
    /// - `Ok(keys)` в порядке удаления
    /// - `Err(SkipReason)`, если удалять нечего
    pub fn keys_for(
        channel: &str,
        payload: &str,
    ) -> Result<Vec<String>, SkipReason> {
        let channel = EventChannel::from_str(channel).map_err(|_| SkipReason::UnknownChannel)?;
        let fields = || PayloadFields::parse(payload).ok_or(SkipReason::MalformedPayload);

        let targets: Vec<String> = match channel {
            // список признаний сбрасывается целиком, payload не нужен
            EventChannel::ConfessionCreated | EventChannel::ConfessionDeleted => {
                return Ok(vec![keys::CONFESSIONS_LIST.to_string()]);
            }
            EventChannel::ConfessionUpdated | EventChannel::ConfessionStarred => fields()?
                .string("id")
                .map(keys::confession_with_comments)
                .into_iter()
                .collect(),
            EventChannel::CommentCreated
            | EventChannel::CommentUpdated
            | EventChannel::CommentDeleted => fields()?
                .string("confession_id")
                .map(keys::confession_with_comments)
                .into_iter()
                .collect(),
            EventChannel::ReactionUpdated | EventChannel::ReactionRemoved => {
                let fields = fields()?;
                let mut found = Vec::with_capacity(2);
                if let Some(id) = fields.string("confession_id") {
                    found.push(keys::confession_with_comments(id));
                }
                if let Some(id) = fields.string("comment_id") {
                    found.push(keys::comment(id));
                }
                found
            }
        };

        if targets.is_empty() {
            return Err(SkipReason::MalformedPayload);
        }
        Ok(targets)
    }

    /// Обрабатывает одно сообщение.
    ///
    /// Удаления выполняются последовательно; ошибка одного удаления
    /// логируется и не мешает остальным.
    ///
    /// # Возвращает
    /// - Количество ключей, удаление которых завершилось без ошибки.
    pub async fn dispatch(
        &self,
        message: &Message,
    ) -> usize {
        self.stats.received.fetch_add(1, Ordering::Relaxed);
        let done = self.invalidate(message).await;
        self.stats.handled.fetch_add(1, Ordering::Release);
        done
    }

    async fn invalidate(
        &self,
        message: &Message,
    ) -> usize {
        let keys = match Self::keys_for(&message.channel, &message.payload) {
            Ok(keys) => keys,
            Err(SkipReason::UnknownChannel) => {
                self.stats.unhandled.fetch_add(1, Ordering::Relaxed);
                warn!(channel = %message.channel, "Unhandled channel");
                return 0;
            }
            Err(SkipReason::MalformedPayload) => {
                self.stats.malformed.fetch_add(1, Ordering::Relaxed);
                debug!(channel = %message.channel, "Payload has nothing to invalidate");
                return 0;
            }
        };

        let mut done = 0;
        for key in &keys {
            match self.cache.delete(key).await {
                Ok(existed) => {
                    done += 1;
                    self.stats.deleted.fetch_add(1, Ordering::Relaxed);
                    debug!(channel = %message.channel, key, existed, "Cache key invalidated");
                }
                Err(e) => {
                    self.stats.delete_failures.fetch_add(1, Ordering::Relaxed);
                    warn!(channel = %message.channel, key, error = %e, "Failed to delete cache key");
                }
            }
        }
        done
    }

    /// Цикл обработки подписки.
    ///
    /// Завершается, когда шина закрыла подписку или отменён `shutdown`,
    /// в зависимости от того, что произойдёт раньше. Начатая обработка
    /// сообщения доводится до конца.
    pub async fn run(
        self,
        mut subscription: Subscription,
        shutdown: CancellationToken,
    ) {
        info!(subscription = subscription.label(), "Invalidation dispatcher started");
        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                next = subscription.recv() => match next {
                    Some(message) => {
                        self.dispatch(&message).await;
                    }
                    None => {
                        info!("Invalidation subscription closed by the bus");
                        break;
                    }
                },
            }
        }
        let stats = self.stats.snapshot();
        info!(
            received = stats.received,
            deleted = stats.deleted,
            failures = stats.delete_failures,
            "Invalidation dispatcher stopped"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use proptest::prelude::*;
    use rstest::rstest;
    use tokio::sync::mpsc;

    use super::*;
    use crate::{
        bus::MemoryBus,
        error::{BusError, BusResult},
    };

    #[rstest]
    #[case("confessions:confession:created", "{}", &["confessions:all"])]
    #[case("confessions:confession:deleted", "not json", &["confessions:all"])]
    #[case(
        "confessions:confession:updated",
        r#"{"id":"x1"}"#,
        &["confessions:x1:with_comments"]
    )]
    #[case(
        "confessions:confession:starred",
        r#"{"id":"x2","author_id":"u"}"#,
        &["confessions:x2:with_comments"]
    )]
    #[case(
        "confessions:comment:created",
        r#"{"id":"c1","confession_id":"x1"}"#,
        &["confessions:x1:with_comments"]
    )]
    #[case(
        "confessions:comment:deleted",
        r#"{"id":"c1","confession_id":"x3"}"#,
        &["confessions:x3:with_comments"]
    )]
    #[case(
        "confessions:reaction:updated",
        r#"{"confession_id":"x1","comment_id":"c9"}"#,
        &["confessions:x1:with_comments", "comments:c9"]
    )]
    #[case(
        "confessions:reaction:removed",
        r#"{"comment_id":"c9"}"#,
        &["comments:c9"]
    )]
    #[case(
        "confessions:reaction:updated",
        r#"{"confession_id":"x4","comment_id":null}"#,
        &["confessions:x4:with_comments"]
    )]
    fn test_routing_table(
        #[case] channel: &str,
        #[case] payload: &str,
        #[case] expected: &[&str],
    ) {
        let keys = InvalidationDispatcher::keys_for(channel, payload).unwrap();
        assert_eq!(keys, expected);
    }

    #[rstest]
    #[case("comments:posted", "{}", SkipReason::UnknownChannel)]
    #[case("confessions:confession", "{}", SkipReason::UnknownChannel)]
    #[case("confessions:confession:updated", "{}", SkipReason::MalformedPayload)]
    #[case("confessions:confession:updated", r#"{"id":""}"#, SkipReason::MalformedPayload)]
    #[case("confessions:comment:updated", r#"{"id":"c1"}"#, SkipReason::MalformedPayload)]
    #[case("confessions:comment:updated", "{broken", SkipReason::MalformedPayload)]
    #[case("confessions:reaction:removed", r#"{"id":"r1"}"#, SkipReason::MalformedPayload)]
    fn test_skipped_events(
        #[case] channel: &str,
        #[case] payload: &str,
        #[case] reason: SkipReason,
    ) {
        assert_eq!(InvalidationDispatcher::keys_for(channel, payload), Err(reason));
    }

    #[tokio::test]
    async fn test_dispatch_deletes_only_target_key() {
        let bus = Arc::new(MemoryBus::new(8));
        bus.set("confessions:x1:with_comments", "cached");
        bus.set("confessions:x2:with_comments", "cached");
        bus.set("confessions:all", "cached");
        let dispatcher = InvalidationDispatcher::new(bus.clone());

        let message = Message::new("confessions:confession:updated", r#"{"id":"x1"}"#);
        assert_eq!(dispatcher.dispatch(&message).await, 1);

        assert!(!bus.contains_key("confessions:x1:with_comments"));
        assert!(bus.contains_key("confessions:x2:with_comments"));
        assert!(bus.contains_key("confessions:all"));
        assert_eq!(bus.delete_count.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_dispatch_counts_skips() {
        let bus = Arc::new(MemoryBus::new(8));
        let dispatcher = InvalidationDispatcher::new(bus.clone());

        dispatcher
            .dispatch(&Message::new("other:channel", "{}"))
            .await;
        dispatcher
            .dispatch(&Message::new("confessions:comment:created", "[1,2]"))
            .await;

        let stats = dispatcher.stats().snapshot();
        assert_eq!(stats.received, 2);
        assert_eq!(stats.handled, 2);
        assert_eq!(stats.unhandled, 1);
        assert_eq!(stats.malformed, 1);
        assert_eq!(stats.deleted, 0);
        assert_eq!(bus.delete_count.load(Ordering::Relaxed), 0);
    }

    struct FlakyCache;

    #[async_trait]
    impl CacheStore for FlakyCache {
        async fn delete(
            &self,
            key: &str,
        ) -> BusResult<bool> {
            if key.starts_with("comments:") {
                Ok(true)
            } else {
                Err(BusError::Closed)
            }
        }
    }

    /// Ошибка одного удаления не отменяет следующее.
    #[tokio::test]
    async fn test_failed_delete_does_not_stop_the_rest() {
        let dispatcher = InvalidationDispatcher::new(Arc::new(FlakyCache));
        let message = Message::new(
            "confessions:reaction:updated",
            r#"{"confession_id":"x1","comment_id":"c1"}"#,
        );

        assert_eq!(dispatcher.dispatch(&message).await, 1);
        let stats = dispatcher.stats().snapshot();
        assert_eq!(stats.deleted, 1);
        assert_eq!(stats.delete_failures, 1);
    }

    #[tokio::test]
    async fn test_run_stops_on_cancel() {
        let (_tx, rx) = mpsc::channel(4);
        let dispatcher = InvalidationDispatcher::new(Arc::new(MemoryBus::default()));
        let token = CancellationToken::new();
        let handle = tokio::spawn(
            dispatcher.run(Subscription::from_channel("test", rx), token.clone()),
        );

        token.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_run_stops_when_input_closes() {
        let (tx, rx) = mpsc::channel(4);
        let bus = Arc::new(MemoryBus::default());
        bus.set("confessions:all", "cached");
        let dispatcher = InvalidationDispatcher::new(bus.clone());
        let stats = dispatcher.stats();

        tx.send(Message::new("confessions:confession:created", "{}"))
            .await
            .unwrap();
        drop(tx);

        tokio::time::timeout(
            Duration::from_secs(1),
            dispatcher.run(Subscription::from_channel("test", rx), CancellationToken::new()),
        )
        .await
        .unwrap();

        assert_eq!(stats.snapshot().deleted, 1);
        assert!(!bus.contains_key("confessions:all"));
    }

    proptest! {
        /// Произвольный payload не вызывает паники, а на неизвестном
        /// канале никогда не даёт ключей.
        #[test]
        fn prop_malformed_payloads_are_harmless(payload in ".*") {
            for channel in EventChannel::all() {
                let _ = InvalidationDispatcher::keys_for(channel, &payload);
            }
            prop_assert_eq!(
                InvalidationDispatcher::keys_for("confessions:unknown", &payload),
                Err(SkipReason::UnknownChannel)
            );
        }

        /// Для событий комментариев всегда ровно один ключ.
        #[test]
        fn prop_comment_events_delete_one_key(id in "[a-z0-9-]{1,24}") {
            let payload = format!(r#"{{"id":"c","confession_id":"{id}"}}"#);
            let keys = InvalidationDispatcher::keys_for("confessions:comment:updated", &payload)
                .unwrap();
            prop_assert_eq!(keys, vec![format!("confessions:{id}:with_comments")]);
        }
    }
}
