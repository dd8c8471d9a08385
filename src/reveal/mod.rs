//! Paced "typewriter" reveal of received payloads.
//!
//! Content is fully received before it is revealed; the scheduler only
//! controls how fast observers see it. A shared [`PacingControl`] lets a
//! caller skip the remaining delay of whatever reveal is running.

mod cursor;
mod pacing;
mod scheduler;

pub use cursor::{RevealCursor, TextUnit};
pub use pacing::PacingControl;
pub use scheduler::{RevealConfig, RevealFrame, RevealKind, RevealScheduler, RevealSummary};
