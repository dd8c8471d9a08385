//! Trait abstractions for dependency injection and testability.
//!
//! # Traits
//!
//! - [`HttpClient`] - HTTP transport (buffered calls and streaming POST)
//! - [`ThreadBackend`] - thread store and scoring used after finalize

pub mod backend;
pub mod http;

pub use backend::ThreadBackend;
pub use http::{ByteStream, Headers, HttpClient, HttpError, Response};
