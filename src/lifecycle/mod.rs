//! Жизненный цикл процесса: упорядоченный запуск обработчиков и
//! ограниченная по времени остановка.
//!
//! ## Подмодули
//!
//! - `coordinator`: порядок запуска, триггеры остановки, слив.
//! - `state`: конечный автомат состояний процесса.
//! - `signal`: ожидание Ctrl+C / SIGTERM.
//! - `serve`: сборка шины по настройкам и запуск координатора.

pub mod coordinator;
mod serve;
mod signal;
pub mod state;

pub use coordinator::{Coordinator, CoordinatorOptions, ShutdownOutcome, ShutdownTrigger};
pub use serve::serve;
pub use signal::shutdown_signal;
pub use state::{LifecycleState, StateCell};
