//! Wire payload structs, deserialized before conversion to typed events.

use serde::Deserialize;
use serde_json::Value;

use crate::models::Citation;

/// One NDJSON record. Only these four fields are read; the rest is ignored.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawRecord {
    #[serde(default)]
    pub content: Value,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub thread_id: Option<Value>,
    #[serde(default, alias = "message_id")]
    pub msg_id: Option<Value>,
}

/// Content of a thought chunk, either inline or as a JSON-encoded string.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ThoughtPayload {
    #[serde(
        default,
        alias = "subId",
        alias = "id",
        deserialize_with = "crate::models::deserialize_opt_id"
    )]
    pub sub_id: Option<String>,
    #[serde(default, alias = "toolName")]
    pub tool_name: Option<String>,
    #[serde(default, alias = "toolType")]
    pub tool_type: Option<String>,
    #[serde(default, alias = "content", alias = "text")]
    pub description: Option<String>,
}

/// Source list wrapped in an object instead of a bare array.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct WrappedSources {
    #[serde(alias = "citations", alias = "source_list")]
    pub sources: Vec<Citation>,
}
