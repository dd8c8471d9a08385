use std::time::Duration;

use tokio::sync::watch;

use super::cursor::{RevealCursor, TextUnit};
use super::pacing::{cleared, PacingControl};
use crate::models::Citation;
use crate::observe::{emit, ObserverEvent, ObserverSender};
use crate::stream::{EventPayload, StreamEvent, ThoughtSlice};

/// Slice sizes and delays for paced reveals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealConfig {
    /// Units per frame for answer and error text
    pub text_slice: usize,
    pub text_interval: Duration,
    /// Units per frame for thought descriptions
    pub thought_slice: usize,
    pub thought_interval: Duration,
    pub unit: TextUnit,
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self {
            text_slice: 5,
            text_interval: Duration::from_millis(17),
            thought_slice: 1,
            thought_interval: Duration::from_millis(34),
            unit: TextUnit::CodePoint,
        }
    }
}

/// What a frame carries.
#[derive(Debug, Clone, PartialEq)]
pub enum RevealKind {
    Text,
    /// Upstream error text, revealed like an answer
    Error,
    Thought {
        sub_id: String,
        tool_name: String,
        tool_type: String,
    },
    Sources(Vec<Citation>),
    Done,
}

/// One observer-facing increment.
#[derive(Debug, Clone, PartialEq)]
pub struct RevealFrame {
    pub message_id: String,
    pub kind: RevealKind,
    /// Text slice (empty for sources and done frames)
    pub slice: String,
    /// Zero-based position within this reveal
    pub index: usize,
    /// True for the final frame of the payload
    pub last: bool,
}

/// How a single reveal went.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RevealSummary {
    pub frames: usize,
    /// The remainder was flushed after pacing was cleared
    pub flushed: bool,
}

/// Re-emits fully received payloads to observers in timed slices.
#[derive(Debug, Clone)]
pub struct RevealScheduler {
    config: RevealConfig,
    pacing: PacingControl,
    observers: ObserverSender,
    restore_on_text: bool,
}

impl RevealScheduler {
    pub fn new(config: RevealConfig, pacing: PacingControl, observers: ObserverSender) -> Self {
        Self {
            config,
            pacing,
            observers,
            restore_on_text: true,
        }
    }

    /// When false, answer and error reveals leave a cleared pacing flag
    /// alone instead of restoring it.
    pub fn with_restore_on_text(mut self, restore: bool) -> Self {
        self.restore_on_text = restore;
        self
    }

    pub fn pacing(&self) -> &PacingControl {
        &self.pacing
    }

    pub fn config(&self) -> &RevealConfig {
        &self.config
    }

    /// Reveal one event's payload. Resolves once the last frame is out.
    pub async fn reveal(&self, event: &StreamEvent) -> RevealSummary {
        let message_id = event.message_id.as_str();
        match &event.payload {
            EventPayload::AnswerText(text) => {
                self.begin_text();
                self.paced(
                    message_id,
                    RevealKind::Text,
                    text,
                    self.config.text_slice,
                    self.config.text_interval,
                )
                .await
            }
            EventPayload::Error(text) => {
                self.begin_text();
                self.paced(
                    message_id,
                    RevealKind::Error,
                    text,
                    self.config.text_slice,
                    self.config.text_interval,
                )
                .await
            }
            EventPayload::Thought(ThoughtSlice {
                sub_id,
                tool_name,
                tool_type,
                description,
            }) => {
                let kind = RevealKind::Thought {
                    sub_id: sub_id.clone(),
                    tool_name: tool_name.clone(),
                    tool_type: tool_type.clone(),
                };
                self.paced(
                    message_id,
                    kind,
                    description,
                    self.config.thought_slice,
                    self.config.thought_interval,
                )
                .await
            }
            EventPayload::Sources(batch) => {
                self.single(message_id, RevealKind::Sources(batch.clone()));
                RevealSummary {
                    frames: 1,
                    flushed: false,
                }
            }
            EventPayload::EndOfThinking => {
                self.single(message_id, RevealKind::Done);
                RevealSummary {
                    frames: 1,
                    flushed: false,
                }
            }
        }
    }

    fn begin_text(&self) {
        if self.restore_on_text {
            self.pacing.restore();
        }
    }

    fn single(&self, message_id: &str, kind: RevealKind) {
        emit(
            &self.observers,
            ObserverEvent::Reveal(RevealFrame {
                message_id: message_id.to_string(),
                kind,
                slice: String::new(),
                index: 0,
                last: true,
            }),
        );
    }

    async fn paced(
        &self,
        message_id: &str,
        kind: RevealKind,
        text: &str,
        step: usize,
        interval: Duration,
    ) -> RevealSummary {
        let mut pacing_rx: watch::Receiver<bool> = self.pacing.subscribe();
        let mut cursor = RevealCursor::new(text, step, self.config.unit);
        let mut summary = RevealSummary::default();

        loop {
            let paced = *pacing_rx.borrow_and_update();
            let slice = if paced {
                cursor.next_slice()
            } else {
                summary.flushed = summary.frames > 0 || cursor.remaining_slices() > 1;
                cursor.rest()
            };
            let Some(slice) = slice else {
                break;
            };

            emit(
                &self.observers,
                ObserverEvent::Reveal(RevealFrame {
                    message_id: message_id.to_string(),
                    kind: kind.clone(),
                    slice: slice.to_string(),
                    index: summary.frames,
                    last: cursor.is_done(),
                }),
            );
            summary.frames += 1;

            if cursor.is_done() {
                break;
            }

            // Fast-forward cuts the delay short.
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = cleared(&mut pacing_rx) => {}
            }
        }

        tracing::trace!(
            msg_id = %message_id,
            frames = summary.frames,
            flushed = summary.flushed,
            "Reveal complete"
        );
        summary
    }
}
