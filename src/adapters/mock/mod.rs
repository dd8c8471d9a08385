//! Mock implementations for testing.
//!
//! - [`MockHttpClient`] - HTTP client with canned and scripted responses
//! - [`MockThreadBackend`] - in-memory thread store with failure injection

pub mod backend;
pub mod http;

pub use backend::{BackendCall, MockThreadBackend};
pub use http::{MockHttpClient, MockResponse, RecordedRequest, StreamStep};
