use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{
    bus::{Message, Subscription},
    network::ConnectionRegistry,
};

/// Пересылает каждое событие пространства имён всем WebSocket-клиентам.
///
/// Payload уходит клиентам без изменений: ни разбора, ни фильтрации.
pub struct BroadcastRelay {
    registry: Arc<ConnectionRegistry>,
    forwarded: Arc<AtomicU64>,
}

impl BroadcastRelay {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self {
            registry,
            forwarded: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Счётчик пересланных событий.
    pub fn forwarded(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.forwarded)
    }

    /// Пересылает одно сообщение.
    pub fn relay(
        &self,
        message: &Message,
    ) {
        let report = self.registry.broadcast(&message.payload);
        self.forwarded.fetch_add(1, Ordering::Relaxed);
        debug!(
            channel = %message.channel,
            delivered = report.delivered,
            dropped = report.dropped,
            "Event relayed to clients"
        );
    }

    /// Цикл пересылки. Останавливается по `shutdown` или при закрытии
    /// подписки шиной.
    pub async fn run(
        self,
        mut subscription: Subscription,
        shutdown: CancellationToken,
    ) {
        info!(subscription = subscription.label(), "Broadcast relay started");
        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                next = subscription.recv() => match next {
                    Some(message) => self.relay(&message),
                    None => {
                        info!("Relay subscription closed by the bus");
                        break;
                    }
                },
            }
        }
        info!(
            forwarded = self.forwarded.load(Ordering::Relaxed),
            "Broadcast relay stopped"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::mpsc;

    use super::*;
    use crate::network::ClientConnection;

    #[tokio::test]
    async fn test_relay_forwards_payload_verbatim() {
        let registry = Arc::new(ConnectionRegistry::new());
        let (conn, mut client_rx) = ClientConnection::channel(registry.next_id(), None, 8);
        registry.add(Arc::new(conn));

        let relay = BroadcastRelay::new(Arc::clone(&registry));
        let forwarded = relay.forwarded();
        let (tx, rx) = mpsc::channel(8);
        let payload = r#"{"id":"x1", "extra":[1,2,3]}"#;
        tx.send(Message::new("confessions:confession:created", payload))
            .await
            .unwrap();
        tx.send(Message::new("confessions:anything:else", "not json"))
            .await
            .unwrap();
        drop(tx);

        tokio::time::timeout(
            Duration::from_secs(1),
            relay.run(Subscription::from_channel("test", rx), CancellationToken::new()),
        )
        .await
        .unwrap();

        assert_eq!(&*client_rx.recv().await.unwrap(), payload);
        assert_eq!(&*client_rx.recv().await.unwrap(), "not json");
        assert_eq!(forwarded.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_relay_with_no_clients() {
        let relay = BroadcastRelay::new(Arc::new(ConnectionRegistry::new()));
        relay.relay(&Message::new("confessions:comment:created", "{}"));
        assert_eq!(relay.forwarded().load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_relay_stops_on_cancel() {
        let (_tx, rx) = mpsc::channel(1);
        let relay = BroadcastRelay::new(Arc::new(ConnectionRegistry::new()));
        let token = CancellationToken::new();
        token.cancel();

        tokio::time::timeout(
            Duration::from_secs(1),
            relay.run(Subscription::from_channel("test", rx), token),
        )
        .await
        .unwrap();
    }
}
