//! Reqwest-backed [`HttpClient`].

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;

use crate::traits::{ByteStream, Headers, HttpClient, HttpError, Response};

/// Production HTTP transport over a shared `reqwest::Client`.
///
/// `post_stream` hands back `bytes_stream()` untouched: chunk boundaries are
/// whatever the network delivers, which is why the line decoder buffers.
#[derive(Debug, Clone, Default)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a preconfigured client (timeouts, proxies, TLS).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Client with a connect timeout. The body itself has no deadline since
    /// an answer stream can legitimately run for minutes.
    pub fn with_connect_timeout(timeout: Duration) -> Result<Self, HttpError> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .build()
            .map_err(|e| HttpError::Other(e.to_string()))?;
        Ok(Self { client })
    }

    pub fn inner(&self) -> &reqwest::Client {
        &self.client
    }

    fn convert_error(err: reqwest::Error) -> HttpError {
        if err.is_timeout() {
            HttpError::Timeout(err.to_string())
        } else if err.is_connect() {
            HttpError::ConnectionFailed(err.to_string())
        } else if err.is_builder() {
            HttpError::InvalidUrl(err.to_string())
        } else if err.is_body() || err.is_decode() {
            HttpError::Io(err.to_string())
        } else {
            HttpError::Other(err.to_string())
        }
    }

    fn request(
        &self,
        method: reqwest::Method,
        url: &str,
        headers: &Headers,
    ) -> reqwest::RequestBuilder {
        headers
            .iter()
            .fold(self.client.request(method, url), |builder, (key, value)| {
                builder.header(key, value)
            })
    }

    async fn buffered(builder: reqwest::RequestBuilder) -> Result<Response, HttpError> {
        let response = builder.send().await.map_err(Self::convert_error)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(Self::convert_error)?;
        Ok(Response::new(status, body))
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn get(&self, url: &str, headers: &Headers) -> Result<Response, HttpError> {
        Self::buffered(self.request(reqwest::Method::GET, url, headers)).await
    }

    async fn post(&self, url: &str, body: &str, headers: &Headers) -> Result<Response, HttpError> {
        let builder = self
            .request(reqwest::Method::POST, url, headers)
            .body(body.to_string());
        Self::buffered(builder).await
    }

    async fn post_stream(
        &self,
        url: &str,
        body: &str,
        headers: &Headers,
    ) -> Result<ByteStream, HttpError> {
        let response = self
            .request(reqwest::Method::POST, url, headers)
            .body(body.to_string())
            .send()
            .await
            .map_err(Self::convert_error)?;

        let status = response.status();
        if !status.is_success() {
            let message = match response.text().await {
                Ok(text) => text,
                Err(_) => status.canonical_reason().unwrap_or("Unknown error").to_string(),
            };
            return Err(HttpError::ServerError {
                status: status.as_u16(),
                message,
            });
        }

        tracing::debug!(url, status = status.as_u16(), "Answer stream opened");
        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(Self::convert_error));
        Ok(Box::pin(stream))
    }
}
