use ::config::{Config, ConfigError, Environment};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::logging::LoggingConfig;

/// Префикс переменных окружения (`MURMUR_BUS__URL` и т.п.).
pub const ENV_PREFIX: &str = "MURMUR";

/// Реализация шины сообщений.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BusBackend {
    #[default]
    Redis,
    /// Внутрипроцессный брокер, без внешних зависимостей.
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusSettings {
    pub backend: BusBackend,
    pub url: String,
    pub connect_timeout_ms: u64,
    /// Ёмкость очереди одной подписки.
    pub subscription_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub listen_address: String,
    pub bus: BusSettings,
    pub shutdown_timeout_secs: u64,
    pub client_queue_capacity: usize,
    /// Разрешённые origin через запятую; `*` разрешает любой.
    pub cors_allow_origins: String,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Settings {
    /// Загружает настройки: значения по умолчанию, затем переменные
    /// окружения с префиксом `MURMUR_`.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_prefix(ENV_PREFIX)
    }

    pub fn load_with_prefix(prefix: &str) -> Result<Self, ConfigError> {
        let cfg = Config::builder()
            .set_default("listen_address", "0.0.0.0:5000")?
            .set_default("bus.backend", "redis")?
            .set_default("bus.url", "redis://redis:6379")?
            .set_default("bus.connect_timeout_ms", 3000)?
            .set_default("bus.subscription_capacity", 1024)?
            .set_default("shutdown_timeout_secs", 10)?
            .set_default("client_queue_capacity", 64)?
            .set_default("cors_allow_origins", "http://localhost:5173")?
            .add_source(
                Environment::with_prefix(prefix)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        cfg.try_deserialize()
    }

    /// Список origin для CORS.
    pub fn cors_origins(&self) -> Vec<String> {
        self.cors_allow_origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_owned)
            .collect()
    }
}
