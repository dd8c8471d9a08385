use std::fmt;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use crate::observe::{emit, ObserverEvent, ObserverSender};

/// Lifecycle of the stream session controller.
///
/// ```text
/// Idle -> Connecting -> Streaming -> Draining -> Idle
///            |              |
///            +--> Cancelled +--> Cooldown -> Idle
/// ```
///
/// A transport failure in `Connecting` or `Streaming` returns to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Idle,
    Connecting,
    Streaming,
    Draining,
    Cancelled,
    Cooldown,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Connecting => "connecting",
            SessionState::Streaming => "streaming",
            SessionState::Draining => "draining",
            SessionState::Cancelled => "cancelled",
            SessionState::Cooldown => "cooldown",
        }
    }

    /// A session owns the pipeline in these states.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            SessionState::Connecting
                | SessionState::Streaming
                | SessionState::Draining
                | SessionState::Cancelled
        )
    }

    /// Whether `self -> next` is a legal transition.
    pub fn can_transition_to(&self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Idle, Connecting)
                | (Connecting, Streaming)
                | (Connecting, Cancelled)
                | (Connecting, Idle)
                | (Streaming, Draining)
                | (Streaming, Cancelled)
                | (Streaming, Idle)
                | (Draining, Idle)
                | (Cancelled, Cooldown)
                | (Cooldown, Idle)
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Controller-owned session state: current state, cooldown deadline and
/// the abort switch of the running session.
#[derive(Debug)]
pub(crate) struct Lifecycle {
    state: SessionState,
    cooldown_until: Option<Instant>,
    abort: Option<watch::Sender<bool>>,
    /// Bumped on every session start so stale cooldown timers can tell
    generation: u64,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self {
            state: SessionState::Idle,
            cooldown_until: None,
            abort: None,
            generation: 0,
        }
    }
}

impl Lifecycle {
    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Move to `next`, announcing it to observers. Illegal moves are logged
    /// and refused.
    pub fn transition(&mut self, next: SessionState, observers: &ObserverSender) -> bool {
        if !self.state.can_transition_to(next) {
            tracing::warn!(from = %self.state, to = %next, "Refusing illegal session transition");
            return false;
        }
        tracing::info!(from = %self.state, to = %next, "Session state changed");
        self.state = next;
        emit(observers, ObserverEvent::Lifecycle(next));
        true
    }

    /// Claim the pipeline for a new session. Returns the abort receiver.
    pub fn start(&mut self, observers: &ObserverSender) -> Option<watch::Receiver<bool>> {
        if !self.transition(SessionState::Connecting, observers) {
            return None;
        }
        let (tx, rx) = watch::channel(false);
        self.abort = Some(tx);
        self.cooldown_until = None;
        self.generation += 1;
        Some(rx)
    }

    /// Signal the running session to abort. False when nothing can be
    /// cancelled.
    pub fn request_abort(&mut self) -> bool {
        if !matches!(self.state, SessionState::Connecting | SessionState::Streaming) {
            return false;
        }
        match &self.abort {
            Some(tx) => {
                tx.send_replace(true);
                true
            }
            None => false,
        }
    }

    /// Enter the cooldown window after a cancelled session.
    pub fn enter_cooldown(&mut self, window: Duration, observers: &ObserverSender) {
        self.abort = None;
        if self.transition(SessionState::Cooldown, observers) {
            self.cooldown_until = Some(Instant::now() + window);
        }
    }

    /// Time left in the cooldown window, zero when it has passed.
    pub fn cooldown_remaining(&self) -> Duration {
        self.cooldown_until
            .map(|until| until.saturating_duration_since(Instant::now()))
            .unwrap_or_default()
    }

    /// Leave cooldown if its window has passed.
    pub fn expire_cooldown(&mut self, observers: &ObserverSender) -> bool {
        if self.state == SessionState::Cooldown && self.cooldown_remaining().is_zero() {
            self.cooldown_until = None;
            return self.transition(SessionState::Idle, observers);
        }
        false
    }

    /// Return to idle after a completed or failed session.
    pub fn finish(&mut self, observers: &ObserverSender) {
        self.abort = None;
        self.transition(SessionState::Idle, observers);
    }
}
