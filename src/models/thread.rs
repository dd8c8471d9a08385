use serde::{Deserialize, Serialize};

use super::{deserialize_id, MessageRole};

/// Thread metadata returned by the thread store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ThreadMeta {
    /// Thread id (string or integer on the wire)
    #[serde(deserialize_with = "deserialize_id", alias = "thread_id")]
    pub id: String,
    #[serde(default, alias = "name")]
    pub title: Option<String>,
}

/// A message as persisted by the thread store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredMessage {
    #[serde(deserialize_with = "deserialize_id", alias = "msg_id")]
    pub id: String,
    #[serde(default)]
    pub role: MessageRole,
    #[serde(default)]
    pub content: String,
}
