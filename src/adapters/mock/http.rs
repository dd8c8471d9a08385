//! Mock HTTP client for testing.
//!
//! Responses are configured per URL (exact match first, then prefix). A
//! streaming response can be a plain list of chunks or a script mixing
//! chunks with delays, a mid-body failure, or a body that never ends.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;

use crate::traits::{ByteStream, Headers, HttpClient, HttpError, Response};

/// A recorded HTTP request for verification in tests.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub url: String,
    pub headers: Headers,
    pub body: Option<String>,
}

impl RecordedRequest {
    /// Body parsed as JSON, if any.
    pub fn json_body(&self) -> Option<serde_json::Value> {
        self.body
            .as_deref()
            .and_then(|body| serde_json::from_str(body).ok())
    }
}

/// One step of a scripted streaming body.
#[derive(Debug, Clone)]
pub enum StreamStep {
    Chunk(Bytes),
    Delay(Duration),
    /// Yield this error and end the body
    Fail(HttpError),
    /// Never yield again
    Hang,
}

impl StreamStep {
    pub fn chunk(data: impl Into<Bytes>) -> Self {
        StreamStep::Chunk(data.into())
    }

    pub fn delay_ms(ms: u64) -> Self {
        StreamStep::Delay(Duration::from_millis(ms))
    }
}

/// Configuration for a mock response.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Buffered response
    Success(Response),
    /// Fail before any response
    Error(HttpError),
    /// Stream these chunks, then end
    Stream(Vec<Bytes>),
    /// Stream following a script
    Scripted(Vec<StreamStep>),
}

impl MockResponse {
    /// Stream one chunk per NDJSON record.
    pub fn ndjson<I, S>(records: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        MockResponse::Stream(
            records
                .into_iter()
                .map(|r| Bytes::from(format!("{}\n", r.as_ref())))
                .collect(),
        )
    }

    pub fn json(status: u16, value: &serde_json::Value) -> Self {
        MockResponse::Success(Response::new(status, value.to_string()))
    }
}

/// Mock HTTP client for testing.
///
/// Clones share responses and recorded requests.
#[derive(Debug, Clone, Default)]
pub struct MockHttpClient {
    responses: Arc<Mutex<HashMap<String, MockResponse>>>,
    default_response: Arc<Mutex<Option<MockResponse>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the response for a URL (exact or prefix match).
    pub fn set_response(&self, url: &str, response: MockResponse) {
        self.responses.lock().insert(url.to_string(), response);
    }

    /// Response for URLs without a specific match.
    pub fn set_default_response(&self, response: MockResponse) {
        *self.default_response.lock() = Some(response);
    }

    pub fn get_requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    /// Recorded requests whose URL contains `fragment`.
    pub fn requests_matching(&self, fragment: &str) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.url.contains(fragment))
            .cloned()
            .collect()
    }

    pub fn clear_requests(&self) {
        self.requests.lock().clear();
    }

    fn record_request(&self, method: &str, url: &str, headers: &Headers, body: Option<&str>) {
        self.requests.lock().push(RecordedRequest {
            method: method.to_string(),
            url: url.to_string(),
            headers: headers.clone(),
            body: body.map(str::to_string),
        });
    }

    fn get_response(&self, url: &str) -> Option<MockResponse> {
        let responses = self.responses.lock();
        if let Some(response) = responses.get(url) {
            return Some(response.clone());
        }
        // Longest prefix wins so nested paths can be overridden.
        let prefixed = responses
            .iter()
            .filter(|(pattern, _)| url.starts_with(pattern.as_str()))
            .max_by_key(|(pattern, _)| pattern.len())
            .map(|(_, response)| response.clone());
        prefixed.or_else(|| self.default_response.lock().clone())
    }

    fn buffered(&self, url: &str) -> Result<Response, HttpError> {
        match self.get_response(url) {
            Some(MockResponse::Success(response)) => Ok(response),
            Some(MockResponse::Error(err)) => Err(err),
            Some(MockResponse::Stream(_)) | Some(MockResponse::Scripted(_)) => Err(
                HttpError::Other("Stream response on non-stream request".to_string()),
            ),
            None => Err(HttpError::Other(format!("No mock response for URL: {}", url))),
        }
    }
}

fn scripted(steps: Vec<StreamStep>) -> ByteStream {
    let steps: VecDeque<StreamStep> = steps.into();
    Box::pin(futures::stream::unfold(steps, |mut steps| async move {
        loop {
            match steps.pop_front()? {
                StreamStep::Chunk(bytes) => return Some((Ok(bytes), steps)),
                StreamStep::Delay(duration) => tokio::time::sleep(duration).await,
                StreamStep::Fail(err) => {
                    steps.clear();
                    return Some((Err(err), steps));
                }
                StreamStep::Hang => std::future::pending::<()>().await,
            }
        }
    }))
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn get(&self, url: &str, headers: &Headers) -> Result<Response, HttpError> {
        self.record_request("GET", url, headers, None);
        self.buffered(url)
    }

    async fn post(&self, url: &str, body: &str, headers: &Headers) -> Result<Response, HttpError> {
        self.record_request("POST", url, headers, Some(body));
        self.buffered(url)
    }

    async fn post_stream(
        &self,
        url: &str,
        body: &str,
        headers: &Headers,
    ) -> Result<ByteStream, HttpError> {
        self.record_request("POST", url, headers, Some(body));

        match self.get_response(url) {
            Some(MockResponse::Stream(chunks)) => {
                Ok(Box::pin(futures::stream::iter(chunks.into_iter().map(Ok))))
            }
            Some(MockResponse::Scripted(steps)) => Ok(scripted(steps)),
            Some(MockResponse::Success(response)) if !response.is_success() => {
                Err(HttpError::ServerError {
                    status: response.status,
                    message: response.text_lossy(),
                })
            }
            Some(MockResponse::Success(_)) => Err(HttpError::Other(
                "Non-stream response on stream request".to_string(),
            )),
            Some(MockResponse::Error(err)) => Err(err),
            None => Err(HttpError::Other(format!("No mock response for URL: {}", url))),
        }
    }
}
