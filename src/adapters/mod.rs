//! Concrete implementations of the traits in `crate::traits`.
//!
//! # Adapters
//!
//! - [`ReqwestHttpClient`] - HTTP transport using reqwest
//! - [`HttpThreadBackend`] - thread store and scoring over any [`HttpClient`](crate::traits::HttpClient)
//!
//! The [`mock`] submodule provides test doubles for both seams.

pub mod http_backend;
pub mod mock;
pub mod reqwest_http;

pub use http_backend::HttpThreadBackend;
pub use mock::{MockHttpClient, MockThreadBackend};
pub use reqwest_http::ReqwestHttpClient;
