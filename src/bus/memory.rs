use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};

use async_trait::async_trait;
use dashmap::DashMap;
use globset::{Glob, GlobMatcher};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, warn};

use super::{CacheStore, Message, MessageBus, Subscription};
use crate::error::{BusError, BusResult};

type ChannelKey = Arc<str>;

/// Отправитель шаблонной подписки вместе со скомпилированным матчером.
struct PatternEntry {
    matcher: GlobMatcher,
    tx: broadcast::Sender<Message>,
}

/// Внутрипроцессная шина сообщений с keyspace для кэша.
///
/// Поддерживает:
/// - Точные подписки по имени канала
/// - Подписки по шаблонам (glob)
/// - Автоматическое удаление пустых каналов
/// - Простое хранилище ключей, из которого конвейер удаляет записи
/// - Статистику публикаций, ошибок отправки и удалений
pub struct MemoryBus {
    /// Точные каналы → `Sender`
    channels: DashMap<ChannelKey, broadcast::Sender<Message>>,
    /// Шаблоны каналов → `Sender`
    patterns: DashMap<Glob, PatternEntry>,
    /// Ключи кэша → значения
    keyspace: DashMap<String, String>,
    /// Ёмкость буфера каждого `broadcast::channel` и очереди подписки
    default_capacity: usize,
    closed: AtomicBool,
    /// Общее количество вызовов `publish`
    pub publish_count: AtomicUsize,
    /// Количество неудачных `send` (нет подписчиков)
    pub send_error_count: AtomicUsize,
    /// Количество вызовов `delete`
    pub delete_count: AtomicUsize,
    /// Количество событий, потерянных отставшими подписчиками
    pub lagged_count: Arc<AtomicUsize>,
}

impl MemoryBus {
    /// Создаёт новую шину с заданной буферной ёмкостью.
    ///
    /// Ёмкость должна покрывать самый длинный ожидаемый всплеск событий:
    /// подписчик, отставший больше чем на `default_capacity` сообщений,
    /// теряет лишние (учитываются в `lagged_count`), и диспетчер
    /// пропускает соответствующие инвалидации.
    pub fn new(default_capacity: usize) -> Self {
        Self {
            channels: DashMap::new(),
            patterns: DashMap::new(),
            keyspace: DashMap::new(),
            default_capacity: default_capacity.max(1),
            closed: AtomicBool::new(false),
            publish_count: AtomicUsize::new(0),
            send_error_count: AtomicUsize::new(0),
            delete_count: AtomicUsize::new(0),
            lagged_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Записывает значение в keyspace.
    pub fn set(
        &self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) {
        self.keyspace.insert(key.into(), value.into());
    }

    /// Возвращает значение ключа, если он есть.
    pub fn get(
        &self,
        key: &str,
    ) -> Option<String> {
        self.keyspace.get(key).map(|v| v.value().clone())
    }

    /// Проверяет наличие ключа в keyspace.
    pub fn contains_key(
        &self,
        key: &str,
    ) -> bool {
        self.keyspace.contains_key(key)
    }

    /// Возвращает все ключи keyspace в отсортированном виде.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.keyspace.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }

    /// Проверяет, был ли вызван `close`.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> BusResult<()> {
        if self.is_closed() {
            return Err(BusError::Closed);
        }
        Ok(())
    }
}

impl Default for MemoryBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[async_trait]
impl MessageBus for MemoryBus {
    async fn ping(&self) -> BusResult<()> {
        self.ensure_open()
    }

    /// Подписка на набор каналов.
    ///
    /// Каждый канал обслуживается своим форвардером, поэтому порядок
    /// сообщений внутри канала сохраняется. Повторяющиеся имена
    /// схлопываются, чтобы сообщение не пришло дважды.
    async fn subscribe(
        &self,
        channels: &[&str],
    ) -> BusResult<Subscription> {
        self.ensure_open()?;

        let mut unique = channels.to_vec();
        unique.sort_unstable();
        unique.dedup();

        let (tx, rx) = mpsc::channel(self.default_capacity);
        let forwarders = unique
            .iter()
            .map(|channel| {
                let key: Arc<str> = Arc::from(*channel);
                let receiver = self
                    .channels
                    .entry(key)
                    .or_insert_with(|| broadcast::channel(self.default_capacity).0)
                    .subscribe();
                tokio::spawn(forward(
                    receiver,
                    tx.clone(),
                    Arc::clone(&self.lagged_count),
                ))
            })
            .collect();

        Ok(Subscription::new(unique.join(","), rx, forwarders))
    }

    /// Подписка по шаблону (glob), например `"confessions:*"`.
    ///
    /// Повторная подписка на тот же шаблон получит тот же `Sender`.
    async fn psubscribe(
        &self,
        pattern: &str,
    ) -> BusResult<Subscription> {
        self.ensure_open()?;

        let glob = Glob::new(pattern)?;
        let matcher = glob.compile_matcher();
        let receiver = self
            .patterns
            .entry(glob)
            .or_insert_with(|| PatternEntry {
                matcher,
                tx: broadcast::channel(self.default_capacity).0,
            })
            .tx
            .subscribe();

        let (tx, rx) = mpsc::channel(self.default_capacity);
        let forwarder = tokio::spawn(forward(receiver, tx, Arc::clone(&self.lagged_count)));

        Ok(Subscription::new(pattern, rx, vec![forwarder]))
    }

    /// Публикация сообщения в канал.
    ///
    /// Работает в два этапа:
    /// 1. Отправляет в точный канал (если есть)
    /// 2. Отправляет всем подписчикам по шаблонам
    ///
    /// Если в точном канале нет подписчиков, увеличивает `send_error_count`
    /// и удаляет канал.
    async fn publish(
        &self,
        channel: &str,
        payload: &str,
    ) -> BusResult<usize> {
        self.ensure_open()?;
        self.publish_count.fetch_add(1, Ordering::Relaxed);

        let channel_key: Arc<str> = Arc::from(channel);
        let mut delivered = 0;

        // 1) точное совпадение
        let drained = match self.channels.get(channel) {
            Some(tx) => match tx.send(Message::new(channel_key.clone(), payload)) {
                Ok(receivers) => {
                    delivered += receivers;
                    false
                }
                Err(_) => {
                    self.send_error_count.fetch_add(1, Ordering::Relaxed);
                    true
                }
            },
            None => false,
        };
        if drained {
            self.channels
                .remove_if(channel, |_, tx| tx.receiver_count() == 0);
        }

        // 2) по шаблону
        for entry in self.patterns.iter() {
            if entry.matcher.is_match(channel) {
                if let Ok(receivers) = entry.tx.send(Message::new(channel_key.clone(), payload)) {
                    delivered += receivers;
                }
            }
        }

        Ok(delivered)
    }

    /// Закрывает шину: все `Sender` удаляются, подписки дочитывают
    /// буфер и завершаются.
    async fn close(&self) -> BusResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.channels.clear();
        self.patterns.clear();
        debug!("In-memory message bus closed");
        Ok(())
    }
}

#[async_trait]
impl CacheStore for MemoryBus {
    async fn delete(
        &self,
        key: &str,
    ) -> BusResult<bool> {
        self.ensure_open()?;
        self.delete_count.fetch_add(1, Ordering::Relaxed);
        Ok(self.keyspace.remove(key).is_some())
    }
}

/// Перекладывает сообщения из `broadcast`-канала шины в очередь подписки.
async fn forward(
    mut receiver: broadcast::Receiver<Message>,
    sink: mpsc::Sender<Message>,
    lagged: Arc<AtomicUsize>,
) {
    loop {
        match receiver.recv().await {
            Ok(msg) => {
                if sink.send(msg).await.is_err() {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                lagged.fetch_add(skipped as usize, Ordering::Relaxed);
                warn!(skipped, "In-memory subscriber lagged behind, events dropped");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
