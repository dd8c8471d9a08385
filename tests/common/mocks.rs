//! Mock implementations for test fixtures.
//!
//! Re-exports the mocks from `answer_stream::adapters::mock` and adds a
//! builder for the HTTP side.

pub use answer_stream::adapters::mock::{
    BackendCall, MockHttpClient, MockResponse, MockThreadBackend, RecordedRequest, StreamStep,
};
pub use answer_stream::traits::{Headers, HttpClient, HttpError, Response};

use bytes::Bytes;

/// Configuration for setting up mock HTTP responses.
pub struct MockHttpConfig {
    client: MockHttpClient,
}

impl MockHttpConfig {
    pub fn new() -> Self {
        Self {
            client: MockHttpClient::new(),
        }
    }

    /// Stream `records` from `url`, one chunk per record.
    pub fn with_records<I, S>(self, url: &str, records: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.client.set_response(url, MockResponse::ndjson(records));
        self
    }

    /// Stream `body` from `url` split into chunks of `size` bytes.
    pub fn with_chunked_body(self, url: &str, body: &str, size: usize) -> Self {
        let chunks = body
            .as_bytes()
            .chunks(size.max(1))
            .map(Bytes::copy_from_slice)
            .collect();
        self.client.set_response(url, MockResponse::Stream(chunks));
        self
    }

    pub fn with_script(self, url: &str, steps: Vec<StreamStep>) -> Self {
        self.client.set_response(url, MockResponse::Scripted(steps));
        self
    }

    /// Configures a successful JSON response.
    #[allow(dead_code)]
    pub fn with_json_response(self, url: &str, status: u16, json: &str) -> Self {
        self.client.set_response(
            url,
            MockResponse::Success(Response::new(status, Bytes::from(json.to_string()))),
        );
        self
    }

    /// Configures a transport error.
    #[allow(dead_code)]
    pub fn with_error(self, url: &str, error: HttpError) -> Self {
        self.client.set_response(url, MockResponse::Error(error));
        self
    }

    pub fn build(self) -> MockHttpClient {
        self.client
    }
}

impl Default for MockHttpConfig {
    fn default() -> Self {
        Self::new()
    }
}
