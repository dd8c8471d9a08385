use chrono::{DateTime, Utc};

use super::SourceMerge;
use crate::models::{Citation, FinalizedMessage, MessageRole, ThoughtItem};
use crate::stream::ThoughtSlice;

/// The single in-progress assistant message.
///
/// Every field only grows: text and descriptions by append, citations by
/// batch. Consuming [`finalize`](Self::finalize) is the only way out.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageAccumulator {
    id: String,
    thread_id: Option<String>,
    role: MessageRole,
    content: String,
    thought_items: Vec<ThoughtItem>,
    source_list: Vec<Vec<Citation>>,
    timestamp: DateTime<Utc>,
    failed: bool,
}

impl MessageAccumulator {
    pub fn new(id: impl Into<String>, thread_id: Option<String>) -> Self {
        Self {
            id: id.into(),
            thread_id,
            role: MessageRole::Assistant,
            content: String::new(),
            thought_items: Vec::new(),
            source_list: Vec::new(),
            timestamp: Utc::now(),
            failed: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn thread_id(&self) -> Option<&str> {
        self.thread_id.as_deref()
    }

    pub fn role(&self) -> MessageRole {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn thought_items(&self) -> &[ThoughtItem] {
        &self.thought_items
    }

    pub fn source_list(&self) -> &[Vec<Citation>] {
        &self.source_list
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn failed(&self) -> bool {
        self.failed
    }

    /// Adopt a thread id learned after the first chunk.
    pub fn observe_thread(&mut self, thread_id: Option<&str>) {
        if self.thread_id.is_none() {
            self.thread_id = thread_id.map(str::to_string);
        }
    }

    pub fn append_text(&mut self, text: &str) {
        self.content.push_str(text);
    }

    /// Merge a thought slice. Returns true if it opened a new item.
    ///
    /// A known `sub_id` gets its description extended; empty tool metadata
    /// is filled in, non-empty metadata is left alone.
    pub fn merge_thought(&mut self, slice: &ThoughtSlice) -> bool {
        if let Some(item) = self
            .thought_items
            .iter_mut()
            .find(|item| item.sub_id == slice.sub_id)
        {
            item.description.push_str(&slice.description);
            if item.tool_name.is_empty() {
                item.tool_name.clone_from(&slice.tool_name);
            }
            if item.tool_type.is_empty() {
                item.tool_type.clone_from(&slice.tool_type);
            }
            return false;
        }

        self.thought_items.push(ThoughtItem {
            sub_id: slice.sub_id.clone(),
            tool_name: slice.tool_name.clone(),
            tool_type: slice.tool_type.clone(),
            description: slice.description.clone(),
        });
        true
    }

    /// Append a citation batch. Returns how many citations were kept.
    ///
    /// `Concatenate` appends every batch, empty ones included. `DedupById`
    /// skips a batch that is empty once duplicates are removed.
    pub fn push_sources(&mut self, batch: &[Citation], merge: SourceMerge) -> usize {
        let kept: Vec<Citation> = match merge {
            SourceMerge::Concatenate => {
                self.source_list.push(batch.to_vec());
                return batch.len();
            }
            SourceMerge::DedupById => {
                let mut kept: Vec<Citation> = Vec::with_capacity(batch.len());
                for citation in batch {
                    let seen = citation.key().is_some_and(|key| {
                        self.source_list
                            .iter()
                            .flatten()
                            .chain(kept.iter())
                            .any(|c| c.key() == Some(key))
                    });
                    if !seen {
                        kept.push(citation.clone());
                    }
                }
                kept
            }
        };

        let count = kept.len();
        if count > 0 {
            self.source_list.push(kept);
        }
        count
    }

    /// Record an upstream error as the message content.
    pub fn fail(&mut self, error: &str) {
        self.content.clear();
        self.content.push_str(error);
        self.failed = true;
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty() && self.thought_items.is_empty() && self.source_list.is_empty()
    }

    /// Copy of the current state in history form, for observers.
    pub fn snapshot(&self, done: bool) -> FinalizedMessage {
        self.clone().finalize(done)
    }

    pub fn finalize(self, done: bool) -> FinalizedMessage {
        FinalizedMessage {
            id: self.id,
            thread_id: self.thread_id,
            role: self.role,
            content: self.content,
            thought_items: self.thought_items,
            source_list: self.source_list,
            timestamp: self.timestamp,
            failed: self.failed,
            done,
        }
    }
}
