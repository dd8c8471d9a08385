//! Error category classification.
//!
//! Categories drive the few handling decisions the pipeline makes itself
//! (whether a failure is worth surfacing as retryable to the caller) and
//! give every error a stable label for logs.

use std::fmt;

/// High-level categorization of pipeline errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Connection refused, reset, DNS, timeouts.
    Network,

    /// Upstream answered with a non-success status.
    Server,

    /// Data on the wire could not be understood.
    Protocol,

    /// A post-stream collaborator (thread store, scoring) failed.
    Backend,

    /// The caller misused the API (e.g. started a second session).
    Client,

    /// Missing or invalid settings.
    Configuration,
}

impl ErrorCategory {
    /// Returns true if the caller may reasonably re-invoke the operation.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorCategory::Network | ErrorCategory::Server | ErrorCategory::Backend
        )
    }

    /// Short label suitable for logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Network => "network",
            ErrorCategory::Server => "server",
            ErrorCategory::Protocol => "protocol",
            ErrorCategory::Backend => "backend",
            ErrorCategory::Client => "client",
            ErrorCategory::Configuration => "configuration",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_retryable() {
        assert!(ErrorCategory::Network.is_retryable());
        assert!(ErrorCategory::Server.is_retryable());
        assert!(ErrorCategory::Backend.is_retryable());
        assert!(!ErrorCategory::Protocol.is_retryable());
        assert!(!ErrorCategory::Client.is_retryable());
        assert!(!ErrorCategory::Configuration.is_retryable());
    }

    #[test]
    fn test_category_display() {
        assert_eq!(format!("{}", ErrorCategory::Network), "network");
        assert_eq!(format!("{}", ErrorCategory::Protocol), "protocol");
    }
}
