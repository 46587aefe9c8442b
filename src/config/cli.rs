use clap::Parser;

use super::settings::{BusBackend, Settings};
use crate::logging::LogFormat;

/// Аргументы командной строки.
///
/// Переменные `PORT`, `REDIS_ADDR` и `CORS_ALLOW_ORIGINS` сохраняют
/// совместимость со старым окружением развёртывания.
#[derive(Debug, Default, Parser)]
#[command(name = "murmur", version, about)]
pub struct Cli {
    /// Порт HTTP/WebSocket слушателя.
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Адрес Redis: `host:port` или полный `redis://` URL.
    #[arg(long, env = "REDIS_ADDR")]
    pub redis_addr: Option<String>,

    /// Разрешённые origin через запятую.
    #[arg(long, env = "CORS_ALLOW_ORIGINS")]
    pub cors_allow_origins: Option<String>,

    /// Реализация шины сообщений.
    #[arg(long, value_enum)]
    pub bus: Option<BusBackend>,

    #[arg(long)]
    pub log_level: Option<String>,

    #[arg(long, value_enum)]
    pub log_format: Option<LogFormat>,
}

impl Cli {
    /// Накладывает заданные аргументы поверх загруженных настроек.
    pub fn apply(
        &self,
        settings: &mut Settings,
    ) {
        if let Some(port) = self.port {
            settings.listen_address = with_port(&settings.listen_address, port);
        }
        if let Some(addr) = &self.redis_addr {
            settings.bus.url = redis_url(addr);
        }
        if let Some(origins) = &self.cors_allow_origins {
            settings.cors_allow_origins = origins.clone();
        }
        if let Some(backend) = self.bus {
            settings.bus.backend = backend;
        }
        if let Some(level) = &self.log_level {
            settings.logging.level = level.clone();
        }
        if let Some(format) = self.log_format {
            settings.logging.format = format;
        }
    }
}

/// Заменяет порт в адресе `host:port`.
fn with_port(
    address: &str,
    port: u16,
) -> String {
    let host = address
        .rsplit_once(':')
        .map(|(host, _)| host)
        .unwrap_or(address);
    format!("{host}:{port}")
}

/// `host:port` превращается в `redis://host:port`; URL остаётся как есть.
fn redis_url(addr: &str) -> String {
    if addr.contains("://") {
        addr.to_string()
    } else {
        format!("redis://{addr}")
    }
}
