use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

/// Shared fast-forward switch for running reveals.
///
/// While paced, reveals step slice by slice. Clearing the flag wakes any
/// reveal waiting between slices; its next emission is the whole remainder.
/// Clones share the same flag.
///
/// [`hold`](Self::hold) pins the flag cleared until
/// [`release`](Self::release); `restore` is ignored meanwhile. Session
/// teardown uses it so queued text reveals cannot re-enable pacing.
#[derive(Debug, Clone)]
pub struct PacingControl {
    tx: Arc<watch::Sender<bool>>,
    held: Arc<AtomicBool>,
}

impl Default for PacingControl {
    fn default() -> Self {
        Self::new(true)
    }
}

impl PacingControl {
    pub fn new(paced: bool) -> Self {
        let (tx, _) = watch::channel(paced);
        Self {
            tx: Arc::new(tx),
            held: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_paced(&self) -> bool {
        *self.tx.borrow()
    }

    /// Clear pacing so running reveals flush immediately.
    pub fn fast_forward(&self) {
        if self.tx.send_replace(false) {
            tracing::debug!("Reveal pacing cleared");
        }
    }

    /// Return to slice-by-slice pacing. No-op while held.
    pub fn restore(&self) {
        if !self.is_held() {
            self.tx.send_replace(true);
        }
    }

    /// Clear pacing and keep it cleared until [`release`](Self::release).
    pub fn hold(&self) {
        self.held.store(true, Ordering::SeqCst);
        self.fast_forward();
    }

    pub fn release(&self) {
        self.held.store(false, Ordering::SeqCst);
    }

    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::SeqCst)
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

/// Resolves once pacing is cleared. Never resolves while it stays set.
pub(crate) async fn cleared(rx: &mut watch::Receiver<bool>) {
    while *rx.borrow_and_update() {
        if rx.changed().await.is_err() {
            // Sender gone; pacing can no longer change.
            std::future::pending::<()>().await;
        }
    }
}
