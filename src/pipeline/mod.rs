//! Фоновые обработчики событий шины.
//!
//! - `invalidation`: удаление производных ключей кэша по точным каналам.
//! - `relay`: пересылка всех событий пространства имён WebSocket-клиентам.
//!
//! Оба обработчика держат собственную подписку и работают независимо.

pub mod invalidation;
pub mod relay;

pub use invalidation::{InvalidationDispatcher, InvalidationStats, SkipReason, StatsSnapshot};
pub use relay::BroadcastRelay;
