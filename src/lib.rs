//! Answer Stream - incremental assembly and paced reveal of streamed answers
//!
//! An upstream endpoint streams newline-delimited JSON records for one
//! answer: thought/tool steps, citation batches, answer text and an end
//! marker. The pipeline decodes them, applies each event in strict stream
//! order through a single-consumer effect queue, assembles the live message,
//! re-emits content to observers in timed slices and reconciles finalized
//! messages with the thread store.
//!
//! Most callers only need [`session::SessionController`] and the
//! [`prelude`].

pub mod adapters;
pub mod assembler;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod observe;
pub mod prelude;
pub mod queue;
pub mod reveal;
pub mod session;
pub mod stream;
pub mod traits;
