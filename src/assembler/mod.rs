//! Incremental content assembly.
//!
//! [`ContentAssembler`] holds at most one live [`MessageAccumulator`] and the
//! [`ConversationHistory`] it is promoted into. Events are applied in stream
//! order by the effect queue worker; the assembler itself does no I/O.
//!
//! Transitions, keyed on message id:
//!
//! | event                    | live accumulator         | result                          |
//! |--------------------------|--------------------------|---------------------------------|
//! | any, new id              | present                  | finalize live, then start fresh |
//! | any, new id              | absent                   | start fresh                     |
//! | thought/sources/text     | same id                  | merge                           |
//! | error                    | same id (or fresh)       | replace content, finalize       |
//! | end_of_thinking          | same id                  | finalize                        |
//! | end_of_thinking, new id  | absent                   | ignored                         |

mod accumulator;
mod history;

pub use accumulator::MessageAccumulator;
pub use history::ConversationHistory;

use crate::models::FinalizedMessage;
use crate::stream::{EventPayload, StreamEvent};

/// How repeated citation batches for one message combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceMerge {
    /// Every batch is appended as received.
    #[default]
    Concatenate,
    /// Citations whose non-empty id was already seen are dropped.
    DedupById,
}

/// What applying one event did to the live message.
#[derive(Debug, Clone, PartialEq)]
pub enum ApplyOutcome {
    /// A fresh accumulator was created and the event merged into it.
    Started,
    /// The event was merged into the existing accumulator.
    Merged,
    /// The event was terminal; the message is now in history.
    Finalized(FinalizedMessage),
    /// Nothing to do (end marker without a live message).
    Ignored,
}

/// Result of [`ContentAssembler::apply`].
#[derive(Debug, Clone, PartialEq)]
pub struct ApplyReport {
    /// Previous live message, finalized because a new id arrived.
    pub superseded: Option<FinalizedMessage>,
    pub outcome: ApplyOutcome,
}

impl ApplyReport {
    fn new(superseded: Option<FinalizedMessage>, outcome: ApplyOutcome) -> Self {
        Self {
            superseded,
            outcome,
        }
    }

    /// Every message finalized by this apply, oldest first.
    pub fn finalized(&self) -> impl Iterator<Item = &FinalizedMessage> {
        let current = match &self.outcome {
            ApplyOutcome::Finalized(message) => Some(message),
            _ => None,
        };
        self.superseded.iter().chain(current)
    }
}

/// Keyed accumulator plus finalized history.
#[derive(Debug, Default)]
pub struct ContentAssembler {
    live: Option<MessageAccumulator>,
    history: ConversationHistory,
    merge: SourceMerge,
}

impl ContentAssembler {
    pub fn new(merge: SourceMerge) -> Self {
        Self {
            live: None,
            history: ConversationHistory::new(),
            merge,
        }
    }

    pub fn live(&self) -> Option<&MessageAccumulator> {
        self.live.as_ref()
    }

    pub fn live_id(&self) -> Option<&str> {
        self.live.as_ref().map(MessageAccumulator::id)
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    pub fn source_merge(&self) -> SourceMerge {
        self.merge
    }

    /// Apply one event in stream order.
    pub fn apply(&mut self, event: &StreamEvent) -> ApplyReport {
        let superseded = match &self.live {
            Some(live) if live.id() != event.message_id => {
                tracing::debug!(
                    previous = %live.id(),
                    msg_id = %event.message_id,
                    "New message id, finalizing live message"
                );
                self.finalize_live(true)
            }
            _ => None,
        };

        let started = if self.live.is_none() {
            if matches!(event.payload, EventPayload::EndOfThinking) {
                tracing::debug!(
                    msg_id = %event.message_id,
                    "End marker without live message, ignoring"
                );
                return ApplyReport::new(superseded, ApplyOutcome::Ignored);
            }
            self.live = Some(MessageAccumulator::new(
                event.message_id.clone(),
                event.thread_id.clone(),
            ));
            true
        } else {
            false
        };

        let merge = self.merge;
        let Some(live) = self.live.as_mut() else {
            return ApplyReport::new(superseded, ApplyOutcome::Ignored);
        };
        live.observe_thread(event.thread_id.as_deref());

        match &event.payload {
            EventPayload::Thought(slice) => {
                live.merge_thought(slice);
            }
            EventPayload::Sources(batch) => {
                let kept = live.push_sources(batch, merge);
                if kept < batch.len() {
                    tracing::debug!(
                        msg_id = %event.message_id,
                        dropped = batch.len() - kept,
                        "Dropped duplicate citations"
                    );
                }
            }
            EventPayload::AnswerText(text) => live.append_text(text),
            EventPayload::Error(message) => {
                live.fail(message);
                return self.terminal(superseded);
            }
            EventPayload::EndOfThinking => return self.terminal(superseded),
        }

        let outcome = if started {
            ApplyOutcome::Started
        } else {
            ApplyOutcome::Merged
        };
        ApplyReport::new(superseded, outcome)
    }

    /// Promote a live accumulator left open when the stream ends or is
    /// aborted. The message is marked not done.
    pub fn finalize_pending(&mut self) -> Option<FinalizedMessage> {
        self.finalize_live(false)
    }

    /// Drop a live accumulator without promoting it. Used when the
    /// transport fails mid-message.
    pub fn discard_pending(&mut self) -> Option<MessageAccumulator> {
        let live = self.live.take()?;
        tracing::debug!(msg_id = %live.id(), "Discarding unfinished message");
        Some(live)
    }

    fn terminal(&mut self, superseded: Option<FinalizedMessage>) -> ApplyReport {
        match self.finalize_live(true) {
            Some(message) => ApplyReport::new(superseded, ApplyOutcome::Finalized(message)),
            None => ApplyReport::new(superseded, ApplyOutcome::Ignored),
        }
    }

    fn finalize_live(&mut self, done: bool) -> Option<FinalizedMessage> {
        let live = self.live.take()?;
        let message = live.finalize(done);
        tracing::info!(
            msg_id = %message.id,
            thread_id = message.thread_id.as_deref().unwrap_or(""),
            failed = message.failed,
            done,
            "Message finalized"
        );
        self.history.push(message.clone());
        Some(message)
    }
}
