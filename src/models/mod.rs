//! Durable and wire-facing data types.

mod message;
mod request;
mod thread;

pub use message::{Citation, FinalizedMessage, MessageRole, ThoughtItem};
pub use request::StreamRequest;
pub use thread::{StoredMessage, ThreadMeta};

use serde::{de, Deserialize, Deserializer};
use serde_json::Value;

/// Render a JSON id (string or integer) as a string.
pub(crate) fn id_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Deserialize an id that the backend may send as a string or an integer.
pub(crate) fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    id_from_value(&value).ok_or_else(|| de::Error::custom("expected a string or integer id"))
}

/// Like [`deserialize_id`] but tolerates a missing or null id.
pub(crate) fn deserialize_opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(value) => id_from_value(&value)
            .map(Some)
            .ok_or_else(|| de::Error::custom("expected a string or integer id")),
    }
}
