//! Observer notifications.
//!
//! Everything observers can see while a session runs goes out on one
//! `tokio::sync::broadcast` channel. Sending never blocks the pipeline: with
//! no subscribers the event is dropped, and slow subscribers lag.

use tokio::sync::broadcast;

use crate::error::ReconcileStep;
use crate::models::{FinalizedMessage, StoredMessage};
use crate::reveal::RevealFrame;
use crate::session::SessionState;

/// Sender half of the observer channel.
pub type ObserverSender = broadcast::Sender<ObserverEvent>;

/// Create an observer channel with the given capacity.
///
/// Further receivers come from `sender.subscribe()`.
pub fn create_observer_channel(
    capacity: usize,
) -> (ObserverSender, broadcast::Receiver<ObserverEvent>) {
    broadcast::channel(capacity.max(1))
}

/// An observer-facing pipeline event.
#[derive(Debug, Clone, PartialEq)]
pub enum ObserverEvent {
    /// A paced slice of live content
    Reveal(RevealFrame),
    /// The session controller changed state
    Lifecycle(SessionState),
    /// A message was promoted into history
    Finalized(FinalizedMessage),
    /// Durable messages reloaded after finalize
    ThreadReloaded {
        thread_id: String,
        messages: Vec<StoredMessage>,
    },
    /// A malformed record was dropped
    RecordSkipped { reason: String },
    /// A post-stream reconciliation step failed
    ReconcileFailed {
        step: ReconcileStep,
        message: String,
    },
}

pub(crate) fn emit(observers: &ObserverSender, event: ObserverEvent) {
    // Err only means nobody is subscribed right now.
    let _ = observers.send(event);
}
