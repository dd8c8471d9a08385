//! Typed stream events.
//!
//! Payloads are decoded once, at the parser boundary. Everything downstream
//! (assembler, reveal scheduler) works on these types only.

use thiserror::Error;

use crate::models::Citation;

/// The five record kinds the pipeline interprets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ThoughtChunk,
    SourceListBatch,
    FinalAnswerChunk,
    EndOfThinking,
    Error,
}

impl EventKind {
    /// Map a wire `type` value to a kind. Unknown values return `None`.
    pub fn from_wire(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "thought_chunk" | "thought" | "tool_thought" => Some(EventKind::ThoughtChunk),
            "source_list" | "sources" | "citations" => Some(EventKind::SourceListBatch),
            "final_answer" | "answer" | "content" => Some(EventKind::FinalAnswerChunk),
            "end_of_thinking" | "done" | "end" => Some(EventKind::EndOfThinking),
            "error" => Some(EventKind::Error),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::ThoughtChunk => "thought_chunk",
            EventKind::SourceListBatch => "source_list",
            EventKind::FinalAnswerChunk => "final_answer",
            EventKind::EndOfThinking => "end_of_thinking",
            EventKind::Error => "error",
        }
    }

    /// Kinds that finalize the live message.
    pub fn is_terminal(&self) -> bool {
        matches!(self, EventKind::EndOfThinking | EventKind::Error)
    }
}

/// One slice of a thought/tool description.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ThoughtSlice {
    pub sub_id: String,
    pub tool_name: String,
    pub tool_type: String,
    pub description: String,
}

/// Decoded event payload.
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    Thought(ThoughtSlice),
    Sources(Vec<Citation>),
    AnswerText(String),
    EndOfThinking,
    Error(String),
}

/// One parsed stream record.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamEvent {
    pub message_id: String,
    pub thread_id: Option<String>,
    pub payload: EventPayload,
}

impl StreamEvent {
    pub fn new(message_id: impl Into<String>, payload: EventPayload) -> Self {
        Self {
            message_id: message_id.into(),
            thread_id: None,
            payload,
        }
    }

    pub fn with_thread(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = Some(thread_id.into());
        self
    }

    pub fn answer(message_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(message_id, EventPayload::AnswerText(text.into()))
    }

    pub fn thought(
        message_id: impl Into<String>,
        sub_id: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self::new(
            message_id,
            EventPayload::Thought(ThoughtSlice {
                sub_id: sub_id.into(),
                description: description.into(),
                ..Default::default()
            }),
        )
    }

    pub fn sources(message_id: impl Into<String>, citations: Vec<Citation>) -> Self {
        Self::new(message_id, EventPayload::Sources(citations))
    }

    pub fn end_of_thinking(message_id: impl Into<String>) -> Self {
        Self::new(message_id, EventPayload::EndOfThinking)
    }

    pub fn error(message_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(message_id, EventPayload::Error(text.into()))
    }

    pub fn kind(&self) -> EventKind {
        match &self.payload {
            EventPayload::Thought(_) => EventKind::ThoughtChunk,
            EventPayload::Sources(_) => EventKind::SourceListBatch,
            EventPayload::AnswerText(_) => EventKind::FinalAnswerChunk,
            EventPayload::EndOfThinking => EventKind::EndOfThinking,
            EventPayload::Error(_) => EventKind::Error,
        }
    }
}

/// Why a record was not turned into an event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    /// Not valid JSON, or a required field is missing or mistyped.
    #[error("Malformed record: {reason}")]
    Malformed { reason: String },

    /// Valid record of a type this pipeline does not dispatch.
    #[error("Unrecognized record type: {0}")]
    UnrecognizedKind(String),
}

impl RecordError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        RecordError::Malformed {
            reason: reason.into(),
        }
    }

    /// Malformed records are counted and logged; unrecognized ones are not.
    pub fn is_malformed(&self) -> bool {
        matches!(self, RecordError::Malformed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_wire() {
        assert_eq!(EventKind::from_wire("thought_chunk"), Some(EventKind::ThoughtChunk));
        assert_eq!(EventKind::from_wire("SOURCES"), Some(EventKind::SourceListBatch));
        assert_eq!(EventKind::from_wire("final_answer"), Some(EventKind::FinalAnswerChunk));
        assert_eq!(EventKind::from_wire("done"), Some(EventKind::EndOfThinking));
        assert_eq!(EventKind::from_wire("error"), Some(EventKind::Error));
        assert_eq!(EventKind::from_wire("usage"), None);
    }

    #[test]
    fn test_terminal_kinds() {
        assert!(EventKind::EndOfThinking.is_terminal());
        assert!(EventKind::Error.is_terminal());
        assert!(!EventKind::FinalAnswerChunk.is_terminal());
        assert!(!EventKind::ThoughtChunk.is_terminal());
    }

    #[test]
    fn test_event_kind_matches_payload() {
        assert_eq!(StreamEvent::answer("m", "x").kind(), EventKind::FinalAnswerChunk);
        assert_eq!(StreamEvent::thought("m", "t", "x").kind(), EventKind::ThoughtChunk);
        assert_eq!(StreamEvent::sources("m", vec![]).kind(), EventKind::SourceListBatch);
        assert_eq!(StreamEvent::end_of_thinking("m").kind(), EventKind::EndOfThinking);
        assert_eq!(StreamEvent::error("m", "x").kind(), EventKind::Error);
    }

    #[test]
    fn test_record_error_display() {
        let err = RecordError::malformed("missing msg_id");
        assert_eq!(err.to_string(), "Malformed record: missing msg_id");
        assert!(err.is_malformed());

        let err = RecordError::UnrecognizedKind("usage".to_string());
        assert!(!err.is_malformed());
    }
}
