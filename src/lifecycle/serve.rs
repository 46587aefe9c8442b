use std::{future::Future, sync::Arc, time::Duration};

use tracing::info;

use super::coordinator::{Coordinator, CoordinatorOptions, ShutdownOutcome};
use crate::{
    bus::{CacheStore, MemoryBus, MessageBus, RedisBus},
    config::{BusBackend, Settings},
    error::StartupError,
};

impl From<&Settings> for CoordinatorOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            listen_address: settings.listen_address.clone(),
            shutdown_timeout: Duration::from_secs(settings.shutdown_timeout_secs),
            client_queue_capacity: settings.client_queue_capacity,
            cors_allow_origins: settings.cors_origins(),
        }
    }
}

/// Поднимает шину выбранного типа и проводит весь жизненный цикл.
///
/// # Возвращает
/// - `Ok(ShutdownOutcome)` после остановки, в том числе по таймауту
/// - `Err(StartupError)`, если процесс не смог запуститься
pub async fn serve<F>(
    settings: &Settings,
    signal: F,
) -> Result<ShutdownOutcome, StartupError>
where
    F: Future<Output = ()>,
{
    let (bus, cache): (Arc<dyn MessageBus>, Arc<dyn CacheStore>) = match settings.bus.backend {
        BusBackend::Redis => {
            let bus = RedisBus::connect(
                &settings.bus.url,
                Duration::from_millis(settings.bus.connect_timeout_ms),
                settings.bus.subscription_capacity,
            )
            .await
            .map_err(StartupError::BusUnreachable)?;
            let bus = Arc::new(bus);
            (bus.clone(), bus)
        }
        BusBackend::Memory => {
            info!("Using in-process message bus");
            let bus = Arc::new(MemoryBus::new(settings.bus.subscription_capacity));
            (bus.clone(), bus)
        }
    };

    Coordinator::connect(bus, cache, CoordinatorOptions::from(settings))
        .await?
        .run(signal)
        .await
}
