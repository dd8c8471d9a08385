//! NDJSON stream decoding and parsing.
//!
//! The answer endpoint streams one JSON object per line:
//!
//! ```text
//! {"content":"Hel","type":"final_answer","thread_id":"t1","msg_id":"m1"}
//! {"content":"lo","type":"final_answer","thread_id":"t1","msg_id":"m1"}
//! {"content":"","type":"end_of_thinking","thread_id":"t1","msg_id":"m1"}
//! ```
//!
//! # Module structure
//! - `decoder` - byte chunks → complete records ([`LineDecoder`])
//! - `events` - typed events ([`StreamEvent`], [`EventKind`], [`RecordError`])
//! - `payloads` - wire structs used during parsing
//! - `parser` - record → event ([`parse_record`])

mod decoder;
mod events;
mod parser;
mod payloads;

pub use decoder::LineDecoder;
pub use events::{EventKind, EventPayload, RecordError, StreamEvent, ThoughtSlice};
pub use parser::parse_record;
