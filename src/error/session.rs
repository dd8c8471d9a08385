//! Session acceptance errors.
//!
//! These are the only errors a caller sees as `Err` from the controller.
//! Failures after a session was accepted end up in the session report.

use thiserror::Error;

use super::category::ErrorCategory;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    /// Another session is connecting, streaming or draining.
    #[error("A stream session is already active ({state})")]
    Busy { state: &'static str },

    /// The request is missing something the transport needs.
    #[error("Invalid stream request: {0}")]
    InvalidRequest(String),
}

impl SessionError {
    pub fn error_code(&self) -> &'static str {
        match self {
            SessionError::Busy { .. } => "E_SESSION_BUSY",
            SessionError::InvalidRequest(_) => "E_SESSION_REQUEST",
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            SessionError::Busy { .. } => ErrorCategory::Client,
            SessionError::InvalidRequest(_) => ErrorCategory::Configuration,
        }
    }
}
