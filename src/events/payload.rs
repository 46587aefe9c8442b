use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Поля JSON-объекта события с нестрогим доступом.
///
/// Разбор выполняется один раз; отсутствующие, `null`, пустые и
/// нестроковые поля считаются отсутствующими.
#[derive(Debug, Clone, Default)]
pub struct PayloadFields {
    fields: Map<String, Value>,
}

impl PayloadFields {
    /// Разбирает payload.
    ///
    /// # Возвращает
    /// - `None`, если payload не является JSON-объектом
    pub fn parse(payload: &str) -> Option<Self> {
        serde_json::from_str::<Map<String, Value>>(payload)
            .ok()
            .map(|fields| Self { fields })
    }

    /// Возвращает непустое строковое значение поля.
    pub fn string(
        &self,
        key: &str,
    ) -> Option<&str> {
        self.fields
            .get(key)
            .and_then(Value::as_str)
            .filter(|value| !value.is_empty())
    }
}

/// Извлекает строковое поле из payload одним вызовом.
///
/// Некорректный JSON и отсутствующее поле дают `None`.
pub fn string_field(
    payload: &str,
    key: &str,
) -> Option<String> {
    PayloadFields::parse(payload).and_then(|fields| fields.string(key).map(str::to_owned))
}

/// Сводка записи признания.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfessionEvent {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
}

/// Сводка записи комментария.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentEvent {
    pub id: String,
    pub confession_id: String,
}

/// Сводка изменения реакции. Реакция принадлежит либо признанию,
/// либо комментарию.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionEvent {
    pub id: String,
    pub confession_id: Option<String>,
    pub comment_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}
