use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role of a message in a conversation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    #[default]
    Assistant,
    System,
}

/// One tool/thought step of an answer.
///
/// `description` grows by append for every chunk carrying the same `sub_id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ThoughtItem {
    pub sub_id: String,
    #[serde(default)]
    pub tool_name: String,
    #[serde(default)]
    pub tool_type: String,
    #[serde(default)]
    pub description: String,
}

/// A single citation inside a source-list batch.
///
/// Every field is optional on the wire; unknown fields are ignored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Citation {
    #[serde(default, deserialize_with = "super::deserialize_opt_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, alias = "link")]
    pub url: Option<String>,
    #[serde(default, alias = "text")]
    pub snippet: Option<String>,
}

impl Citation {
    /// Non-empty citation id, if any.
    pub fn key(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.is_empty())
    }
}

/// A message promoted into conversation history.
///
/// Finalized messages are never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FinalizedMessage {
    pub id: String,
    pub thread_id: Option<String>,
    pub role: MessageRole,
    pub content: String,
    pub thought_items: Vec<ThoughtItem>,
    /// Citation batches in arrival order
    pub source_list: Vec<Vec<Citation>>,
    pub timestamp: DateTime<Utc>,
    pub failed: bool,
    /// False when the stream ended or was aborted before a terminal event
    pub done: bool,
}

impl FinalizedMessage {
    /// All citations across batches, in arrival order.
    pub fn citations(&self) -> impl Iterator<Item = &Citation> {
        self.source_list.iter().flatten()
    }

    /// Look up a thought item by its sub id.
    pub fn thought(&self, sub_id: &str) -> Option<&ThoughtItem> {
        self.thought_items.iter().find(|item| item.sub_id == sub_id)
    }
}
