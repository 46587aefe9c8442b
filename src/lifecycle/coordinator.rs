use std::{future::Future, io, net::SocketAddr, sync::Arc, time::Duration};

use tokio::task::{JoinError, JoinHandle};
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{debug, error, info, warn};

use super::state::{LifecycleState, StateCell};
use crate::{
    bus::{CacheStore, MessageBus},
    error::StartupError,
    events::NAMESPACE_PATTERN,
    network::{server, AppState, ConnectionRegistry},
    pipeline::{BroadcastRelay, InvalidationDispatcher, InvalidationStats},
};

/// Параметры запуска и остановки.
#[derive(Debug, Clone)]
pub struct CoordinatorOptions {
    pub listen_address: String,
    pub shutdown_timeout: Duration,
    pub client_queue_capacity: usize,
    pub cors_allow_origins: Vec<String>,
}

impl Default for CoordinatorOptions {
    fn default() -> Self {
        Self {
            listen_address: "0.0.0.0:5000".to_string(),
            shutdown_timeout: Duration::from_secs(10),
            client_queue_capacity: 64,
            cors_allow_origins: vec!["http://localhost:5173".to_string()],
        }
    }
}

/// Что запустило остановку.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownTrigger {
    /// Внешний сигнал (SIGINT/SIGTERM).
    Signal,
    /// Задача HTTP-слушателя завершилась сама.
    ListenerExited,
}

/// Итог остановки.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// Обработчики, реестр и шина закрыты в срок.
    Completed,
    /// Окно остановки истекло, слив брошен.
    TimedOut,
    /// Задача слива завершилась паникой.
    Panicked,
}

/// Координатор жизненного цикла.
///
/// Запускает обработчики в фиксированном порядке и останавливает их
/// за ограниченное время. Обработчики регистрируются в `TaskTracker`
/// до начала потребления, поэтому остановка всегда их дожидается.
pub struct Coordinator {
    bus: Arc<dyn MessageBus>,
    cache: Arc<dyn CacheStore>,
    registry: Arc<ConnectionRegistry>,
    options: CoordinatorOptions,
    state: StateCell,
    shutdown: CancellationToken,
    workers: TaskTracker,
    listener: Option<JoinHandle<io::Result<()>>>,
    local_addr: Option<SocketAddr>,
    invalidation_stats: Option<Arc<InvalidationStats>>,
}

impl Coordinator {
    /// Проверяет доступность шины и создаёт координатор.
    ///
    /// Недоступная шина фатальна: процесс без неё бесполезен.
    pub async fn connect(
        bus: Arc<dyn MessageBus>,
        cache: Arc<dyn CacheStore>,
        options: CoordinatorOptions,
    ) -> Result<Self, StartupError> {
        bus.ping().await.map_err(StartupError::BusUnreachable)?;
        debug!("Message bus answered ping");

        Ok(Self {
            bus,
            cache,
            registry: Arc::new(ConnectionRegistry::new()),
            options,
            state: StateCell::new(),
            shutdown: CancellationToken::new(),
            workers: TaskTracker::new(),
            listener: None,
            local_addr: None,
            invalidation_stats: None,
        })
    }

    pub fn registry(&self) -> Arc<ConnectionRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn state(&self) -> LifecycleState {
        self.state.get()
    }

    /// Фактический адрес слушателя после `start`.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    pub fn invalidation_stats(&self) -> Option<Arc<InvalidationStats>> {
        self.invalidation_stats.clone()
    }

    /// Запускает диспетчер, слушатель и ретранслятор, именно в этом
    /// порядке.
    ///
    /// При ошибке уже запущенные части отменяются до возврата ошибки.
    pub async fn start(&mut self) -> Result<(), StartupError> {
        if self.state.get() != LifecycleState::Starting || self.listener.is_some() {
            return Err(StartupError::AlreadyStarted);
        }

        if let Err(e) = self.start_components().await {
            error!(error = %e, "Startup failed, cancelling started components");
            self.state.advance(LifecycleState::ShuttingDown);
            self.shutdown.cancel();
            self.workers.close();
            self.workers.wait().await;
            if let Some(listener) = self.listener.take() {
                report_listener_stop(listener.await);
            }
            self.state.advance(LifecycleState::Stopped);
            return Err(e);
        }

        self.state.advance(LifecycleState::Running);
        Ok(())
    }

    async fn start_components(&mut self) -> Result<(), StartupError> {
        let channels = InvalidationDispatcher::channels();
        let subscription =
            self.bus
                .subscribe(&channels)
                .await
                .map_err(|source| StartupError::Subscribe {
                    worker: "invalidation dispatcher",
                    source,
                })?;
        let dispatcher = InvalidationDispatcher::new(Arc::clone(&self.cache));
        self.invalidation_stats = Some(dispatcher.stats());
        self.workers
            .spawn(dispatcher.run(subscription, self.shutdown.clone()));
        info!(channels = channels.len(), "Invalidation dispatcher subscribed");

        let listener = server::bind(&self.options.listen_address).await?;
        self.local_addr = listener.local_addr().ok();
        let router = server::build_router(
            AppState::new(self.registry(), self.options.client_queue_capacity),
            &self.options.cors_allow_origins,
        );
        self.listener = Some(server::spawn_listener(
            listener,
            router,
            self.shutdown.clone(),
        ));
        info!(address = ?self.local_addr, "WebSocket listener started");

        let subscription =
            self.bus
                .psubscribe(NAMESPACE_PATTERN)
                .await
                .map_err(|source| StartupError::Subscribe {
                    worker: "broadcast relay",
                    source,
                })?;
        let relay = BroadcastRelay::new(self.registry());
        self.workers.spawn(relay.run(subscription, self.shutdown.clone()));
        info!(pattern = NAMESPACE_PATTERN, "Broadcast relay subscribed");

        Ok(())
    }

    /// Ждёт внешний сигнал или завершение слушателя.
    pub async fn wait_for_shutdown<F>(
        &mut self,
        signal: F,
    ) -> ShutdownTrigger
    where
        F: Future<Output = ()>,
    {
        let Some(listener) = self.listener.as_mut() else {
            signal.await;
            return ShutdownTrigger::Signal;
        };

        let exited = tokio::select! {
            _ = signal => None,
            result = listener => Some(result),
        };

        match exited {
            None => ShutdownTrigger::Signal,
            Some(result) => {
                self.listener = None;
                match result {
                    Ok(Ok(())) => warn!("Listener exited unexpectedly"),
                    Ok(Err(e)) => error!(error = %e, "Listener failed"),
                    Err(e) => error!(error = %e, "Listener task panicked"),
                }
                ShutdownTrigger::ListenerExited
            }
        }
    }

    /// Останавливает обработчики, закрывает соединения и шину.
    ///
    /// Слив выполняется в отдельной задаче и ограничен
    /// `shutdown_timeout`; по истечении окна он бросается.
    pub async fn shutdown(&mut self) -> ShutdownOutcome {
        self.state.advance(LifecycleState::ShuttingDown);
        info!(
            timeout_secs = self.options.shutdown_timeout.as_secs_f64(),
            "Shutting down"
        );

        self.shutdown.cancel();
        self.workers.close();

        let workers = self.workers.clone();
        let registry = Arc::clone(&self.registry);
        let bus = Arc::clone(&self.bus);
        let listener = self.listener.take();
        let drain = tokio::spawn(async move {
            workers.wait().await;
            debug!("Workers stopped");

            let closed = registry.shutdown();
            debug!(closed, "Client connections closed");

            if let Err(e) = bus.close().await {
                warn!(error = %e, "Failed to close message bus");
            }

            if let Some(listener) = listener {
                report_listener_stop(listener.await);
            }
        });

        let outcome = match tokio::time::timeout(self.options.shutdown_timeout, drain).await {
            Ok(Ok(())) => {
                info!("Shutdown complete");
                ShutdownOutcome::Completed
            }
            Ok(Err(e)) => {
                error!(error = %e, "Shutdown drain panicked");
                ShutdownOutcome::Panicked
            }
            Err(_) => {
                warn!(
                    timeout_secs = self.options.shutdown_timeout.as_secs_f64(),
                    "Shutdown timed out, abandoning drain"
                );
                ShutdownOutcome::TimedOut
            }
        };

        self.state.advance(LifecycleState::Stopped);
        outcome
    }

    /// Полный цикл: запуск, ожидание сигнала, остановка.
    pub async fn run<F>(
        mut self,
        signal: F,
    ) -> Result<ShutdownOutcome, StartupError>
    where
        F: Future<Output = ()>,
    {
        self.start().await?;
        let trigger = self.wait_for_shutdown(signal).await;
        info!(?trigger, "Shutdown triggered");
        Ok(self.shutdown().await)
    }
}

/// Логирует итог задачи слушателя, остановленной координатором.
fn report_listener_stop(result: Result<io::Result<()>, JoinError>) {
    match result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(error = %e, "Listener stopped with error"),
        Err(e) if e.is_cancelled() => debug!("Listener task cancelled"),
        Err(e) => warn!(error = %e, "Listener task panicked"),
    }
}
