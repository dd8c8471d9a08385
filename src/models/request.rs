use serde::{Deserialize, Serialize};

/// Request body for the streaming answer endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StreamRequest {
    pub account_id: String,
    /// None means the backend creates a new thread
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    pub query: String,
}

impl StreamRequest {
    /// Request that starts a new thread
    pub fn new(account_id: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            thread_id: None,
            query: query.into(),
        }
    }

    /// Continue an existing thread
    pub fn with_thread(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = Some(thread_id.into());
        self
    }

    /// Whether the thread id was known before the stream opened.
    pub fn has_thread(&self) -> bool {
        self.thread_id.as_deref().is_some_and(|id| !id.is_empty())
    }
}
