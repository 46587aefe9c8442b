//! Таксономия событий: каналы, формат payload, производные ключи кэша
//! и издатель для обработчиков записи.

mod channel;
pub mod keys;
mod payload;
mod publisher;

pub use channel::{EventChannel, NAMESPACE_PATTERN};
pub use payload::{string_field, CommentEvent, ConfessionEvent, PayloadFields, ReactionEvent};
pub use publisher::EventPublisher;
