//! Transport-level stream errors.
//!
//! Any of these ends the session: the read loop stops, held resources are
//! released and the controller returns to idle. Nothing here is retried
//! automatically; re-invoking with the same thread id is up to the caller.

use thiserror::Error;

use super::category::ErrorCategory;
use crate::traits::HttpError;

/// Failure of the upstream streaming transport.
#[derive(Debug, Clone, Error)]
pub enum StreamError {
    /// The connection could not be established.
    #[error("Stream connection failed: {message}")]
    Connect { message: String },

    /// Upstream answered with a non-success status.
    #[error("Stream request rejected ({status}): {message}")]
    HttpStatus { status: u16, message: String },

    /// The body failed while it was being read.
    #[error("Stream body error: {message}")]
    Body { message: String },

    /// The request could not be built or sent.
    #[error("Stream request error: {message}")]
    Request { message: String },
}

impl StreamError {
    /// Short error code for logging.
    pub fn error_code(&self) -> &'static str {
        match self {
            StreamError::Connect { .. } => "E_STREAM_CONN",
            StreamError::HttpStatus { .. } => "E_STREAM_STATUS",
            StreamError::Body { .. } => "E_STREAM_BODY",
            StreamError::Request { .. } => "E_STREAM_REQUEST",
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            StreamError::Connect { .. } | StreamError::Body { .. } => ErrorCategory::Network,
            StreamError::HttpStatus { status, .. } if *status >= 500 => ErrorCategory::Server,
            StreamError::HttpStatus { .. } => ErrorCategory::Client,
            StreamError::Request { .. } => ErrorCategory::Configuration,
        }
    }

    /// Whether re-invoking the session could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }

    /// Classify a failure that happened while opening the stream.
    pub fn from_open(err: HttpError) -> Self {
        match err {
            HttpError::ServerError { status, message } => StreamError::HttpStatus { status, message },
            HttpError::ConnectionFailed(message) | HttpError::Timeout(message) => {
                StreamError::Connect { message }
            }
            HttpError::InvalidUrl(message) => StreamError::Request { message },
            other => StreamError::Connect {
                message: other.to_string(),
            },
        }
    }

    /// Classify a failure that happened mid-body.
    pub fn from_body(err: HttpError) -> Self {
        StreamError::Body {
            message: err.to_string(),
        }
    }
}
