use std::sync::Arc;

/// Сообщение, доставленное подписчику шины.
///
/// `channel` содержит фактическое имя канала публикации, даже если
/// сообщение пришло через подписку по шаблону.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub channel: Arc<str>,
    pub payload: String,
}

impl Message {
    pub fn new(
        channel: impl Into<Arc<str>>,
        payload: impl Into<String>,
    ) -> Self {
        Self {
            channel: channel.into(),
            payload: payload.into(),
        }
    }
}
