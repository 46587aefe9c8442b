//! Настройки процесса: `config` (значения по умолчанию + окружение)
//! и переопределения из командной строки.

mod cli;
mod settings;

pub use cli::Cli;
pub use settings::{BusBackend, BusSettings, Settings, ENV_PREFIX};
