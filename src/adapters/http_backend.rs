//! [`ThreadBackend`] over the REST thread API.
//!
//! | step            | request                              |
//! |-----------------|--------------------------------------|
//! | thread metadata | `POST /v1/threads`                   |
//! | reload          | `GET /v1/threads/{id}/messages`      |
//! | scoring         | `POST /v1/recommendations/score`     |

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::PipelineConfig;
use crate::error::ReconcileError;
use crate::models::{StoredMessage, ThreadMeta};
use crate::traits::{Headers, HttpClient, Response, ThreadBackend};

const THREADS_PATH: &str = "/v1/threads";
const SCORE_PATH: &str = "/v1/recommendations/score";

#[derive(Debug, Serialize)]
struct ThreadRequest<'a> {
    account_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    thread_id: Option<&'a str>,
    title: &'a str,
}

#[derive(Debug, Serialize)]
struct ScoreRequest<'a> {
    thread_id: &'a str,
    msg_id: &'a str,
}

/// The messages endpoint answers with a bare array or a wrapped one.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MessagesBody {
    Bare(Vec<StoredMessage>),
    Wrapped { messages: Vec<StoredMessage> },
}

/// Thread store client sharing the session's [`HttpClient`].
#[derive(Clone)]
pub struct HttpThreadBackend {
    client: Arc<dyn HttpClient>,
    base_url: String,
    auth_token: Option<String>,
}

impl std::fmt::Debug for HttpThreadBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpThreadBackend")
            .field("base_url", &self.base_url)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl HttpThreadBackend {
    pub fn new(client: Arc<dyn HttpClient>, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth_token: None,
        }
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// Backend pointed at the same base URL and token as the stream.
    pub fn from_config(client: Arc<dyn HttpClient>, config: &PipelineConfig) -> Self {
        let backend = Self::new(client, config.base_url.clone());
        match &config.auth_token {
            Some(token) => backend.with_auth_token(token.clone()),
            None => backend,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn headers(&self) -> Headers {
        let mut headers = Headers::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        headers.insert("Accept".to_string(), "application/json".to_string());
        if let Some(token) = &self.auth_token {
            headers.insert("Authorization".to_string(), format!("Bearer {}", token));
        }
        headers
    }

    fn encode<T: Serialize>(body: &T) -> Result<String, ReconcileError> {
        serde_json::to_string(body).map_err(|e| ReconcileError::InvalidResponse(e.to_string()))
    }

    fn check(response: Response) -> Result<Response, ReconcileError> {
        if response.is_success() {
            Ok(response)
        } else {
            Err(ReconcileError::Rejected {
                status: response.status,
                message: response.text_lossy(),
            })
        }
    }
}

#[async_trait]
impl ThreadBackend for HttpThreadBackend {
    async fn create_or_fetch_thread(
        &self,
        account_id: &str,
        thread_id: Option<&str>,
        title_hint: &str,
    ) -> Result<ThreadMeta, ReconcileError> {
        let body = Self::encode(&ThreadRequest {
            account_id,
            thread_id,
            title: title_hint,
        })?;
        let response = self
            .client
            .post(&self.url(THREADS_PATH), &body, &self.headers())
            .await?;
        Self::check(response)?
            .json::<ThreadMeta>()
            .map_err(|e| ReconcileError::InvalidResponse(e.to_string()))
    }

    async fn load_thread_messages(
        &self,
        thread_id: &str,
    ) -> Result<Vec<StoredMessage>, ReconcileError> {
        let url = self.url(&format!("{}/{}/messages", THREADS_PATH, thread_id));
        let response = self.client.get(&url, &self.headers()).await?;
        let body = Self::check(response)?
            .json::<MessagesBody>()
            .map_err(|e| ReconcileError::InvalidResponse(e.to_string()))?;
        Ok(match body {
            MessagesBody::Bare(messages) | MessagesBody::Wrapped { messages } => messages,
        })
    }

    async fn score_recommendations(
        &self,
        thread_id: &str,
        message_id: &str,
    ) -> Result<(), ReconcileError> {
        let body = Self::encode(&ScoreRequest {
            thread_id,
            msg_id: message_id,
        })?;
        let response = self
            .client
            .post(&self.url(SCORE_PATH), &body, &self.headers())
            .await?;
        Self::check(response).map(|_| ())
    }
}
