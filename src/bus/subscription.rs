use std::sync::Arc;

use tokio::{sync::mpsc, task::JoinHandle};

use super::Message;

/// Долгоживущая подписка на набор каналов или на glob-шаблон.
///
/// Сообщения приходят из фоновых задач-форвардеров, которые читают
/// соединение с шиной и складывают сообщения в очередь подписки.
/// Порядок внутри одного канала сохраняется.
///
/// Отписка происходит автоматически при `Drop`: форвардеры
/// останавливаются, и соединение подписки закрывается.
pub struct Subscription {
    /// Человекочитаемое описание подписки (каналы или шаблон).
    label: Arc<str>,
    inner: mpsc::Receiver<Message>,
    forwarders: Vec<JoinHandle<()>>,
}

impl Subscription {
    pub(crate) fn new(
        label: impl Into<Arc<str>>,
        inner: mpsc::Receiver<Message>,
        forwarders: Vec<JoinHandle<()>>,
    ) -> Self {
        Self {
            label: label.into(),
            inner,
            forwarders,
        }
    }

    /// Создаёт подписку поверх готовой очереди.
    ///
    /// Используется тестами и внешними адаптерами шины, которые сами
    /// управляют доставкой сообщений.
    pub fn from_channel(
        label: impl Into<Arc<str>>,
        inner: mpsc::Receiver<Message>,
    ) -> Self {
        Self::new(label, inner, Vec::new())
    }

    /// Асинхронно ожидает следующее сообщение.
    ///
    /// # Возвращает
    /// - `Some(Message)` при получении сообщения
    /// - `None`, если шина закрыла подписку и очередь пуста
    pub async fn recv(&mut self) -> Option<Message> {
        self.inner.recv().await
    }

    /// Возвращает описание подписки.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Возвращает количество сообщений в очереди.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Проверяет, пуста ли очередь сообщений.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        for forwarder in &self.forwarders {
            forwarder.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Тест проверяет, что сообщения из очереди приходят по порядку,
    /// а после закрытия отправителя `recv` возвращает `None`.
    #[tokio::test]
    async fn test_recv_in_order_then_none() {
        let (tx, rx) = mpsc::channel(4);
        let mut sub = Subscription::from_channel("test", rx);

        tx.send(Message::new("a", "1")).await.unwrap();
        tx.send(Message::new("a", "2")).await.unwrap();
        drop(tx);

        assert_eq!(sub.len(), 2);
        assert_eq!(sub.recv().await.unwrap().payload, "1");
        assert_eq!(sub.recv().await.unwrap().payload, "2");
        assert!(sub.recv().await.is_none());
        assert!(sub.is_empty());
    }

    /// Тест проверяет, что drop подписки останавливает форвардеры.
    #[tokio::test]
    async fn test_drop_aborts_forwarders() {
        let (_tx, rx) = mpsc::channel::<Message>(1);
        let forwarder = tokio::spawn(std::future::pending::<()>());
        let handle = forwarder.abort_handle();

        let sub = Subscription::new("pending", rx, vec![forwarder]);
        assert_eq!(sub.label(), "pending");
        drop(sub);

        for _ in 0..10 {
            if handle.is_finished() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(handle.is_finished());
    }
}
