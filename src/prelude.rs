//! Prelude module for convenient imports.
//!
//! ```
//! use answer_stream::prelude::*;
//!
//! let config = PipelineConfig::default().with_text_unit(TextUnit::Byte);
//! assert_eq!(config.reveal.unit, TextUnit::Byte);
//! ```

// Session control
pub use crate::session::{
    ReconcileFailure, SessionController, SessionOutcome, SessionReport, SessionState,
};

// Configuration
pub use crate::config::{PipelineConfig, RevealConfig, SourceMerge, TextUnit};

// Observation
pub use crate::observe::{ObserverEvent, ObserverSender};
pub use crate::reveal::{PacingControl, RevealFrame, RevealKind};

// Model types
pub use crate::models::{
    Citation, FinalizedMessage, MessageRole, StoredMessage, StreamRequest, ThoughtItem, ThreadMeta,
};

// Errors
pub use crate::error::{ErrorCategory, ReconcileError, SessionError, StreamError};

// Seams and their default implementations
pub use crate::adapters::{HttpThreadBackend, ReqwestHttpClient};
pub use crate::traits::{HttpClient, ThreadBackend};
