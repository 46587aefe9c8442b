//! Производные ключи кэша.
//!
//! Ключи пишут пути чтения (вне этого крейта), конвейер их только удаляет.

/// Агрегированный список всех признаний.
pub const CONFESSIONS_LIST: &str = "confessions:all";

/// Признание вместе с комментариями.
pub fn confession_with_comments(confession_id: &str) -> String {
    format!("confessions:{confession_id}:with_comments")
}

/// Кэш отдельного комментария.
pub fn comment(comment_id: &str) -> String {
    format!("comments:{comment_id}")
}
