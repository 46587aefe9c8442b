use strum::IntoEnumIterator;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString, IntoStaticStr};

/// Шаблон, покрывающий всё пространство имён событий.
pub const NAMESPACE_PATTERN: &str = "confessions:*";

/// Закрытая таксономия каналов шины.
///
/// Имена каналов являются частью проводного контракта: на них опираются
/// другие сервисы, поэтому менять строки нельзя.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    AsRefStr,
    Display,
    EnumIter,
    EnumString,
    IntoStaticStr,
)]
pub enum EventChannel {
    #[strum(serialize = "confessions:confession:created")]
    ConfessionCreated,
    #[strum(serialize = "confessions:confession:updated")]
    ConfessionUpdated,
    #[strum(serialize = "confessions:confession:deleted")]
    ConfessionDeleted,
    #[strum(serialize = "confessions:confession:starred")]
    ConfessionStarred,
    #[strum(serialize = "confessions:comment:created")]
    CommentCreated,
    #[strum(serialize = "confessions:comment:updated")]
    CommentUpdated,
    #[strum(serialize = "confessions:comment:deleted")]
    CommentDeleted,
    #[strum(serialize = "confessions:reaction:updated")]
    ReactionUpdated,
    #[strum(serialize = "confessions:reaction:removed")]
    ReactionRemoved,
}

impl EventChannel {
    /// Имя канала на шине.
    pub fn as_str(self) -> &'static str {
        self.into()
    }

    /// Все каналы, на которые подписывается диспетчер инвалидации.
    pub fn all() -> Vec<&'static str> {
        Self::iter().map(Self::as_str).collect()
    }
}
