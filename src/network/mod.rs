//! Сетевой модуль: реестр клиентских соединений и WebSocket-слушатель.
//!
//! ## Подмодули
//!
//! - `connection`: handle одного клиента с очередью исходящих сообщений.
//! - `connection_registry`: набор живых соединений и широковещательная
//!   рассылка.
//! - `server`: axum-маршрутизатор (`/ws`, `/health`) и запуск слушателя.

pub mod connection;
pub mod connection_registry;
pub mod server;

pub use connection::{ClientConnection, ConnectionId};
pub use connection_registry::{BroadcastReport, ConnectionRegistry};
pub use server::{bind, build_router, spawn_listener, AppState};
