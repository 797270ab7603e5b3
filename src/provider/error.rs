//! Search provider error types

use thiserror::Error;

/// Search failure with classification
#[derive(Debug, Error)]
#[error("{message}")]
pub struct SearchError {
    pub kind: SearchErrorKind,
    pub message: String,
}

impl SearchError {
    pub fn new(kind: SearchErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn cancelled() -> Self {
        Self::new(SearchErrorKind::Cancelled, "search cancelled")
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(SearchErrorKind::Network, message)
    }

    pub fn server_error(message: impl Into<String>) -> Self {
        Self::new(SearchErrorKind::ServerError, message)
    }

    pub fn invalid_criteria(message: impl Into<String>) -> Self {
        Self::new(SearchErrorKind::InvalidCriteria, message)
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(SearchErrorKind::Decode, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(SearchErrorKind::Unknown, message)
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind == SearchErrorKind::Cancelled
    }
}

impl From<reqwest::Error> for SearchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::decode(e.to_string())
        } else {
            Self::network(e.to_string())
        }
    }
}

/// Error classification for retry logic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchErrorKind {
    /// The search was cancelled through its token
    Cancelled,
    /// Connection failures, timeouts - retryable
    Network,
    /// Availability API returned 5xx - retryable
    ServerError,
    /// Availability API rejected the request (4xx) - not retryable
    InvalidCriteria,
    /// Response body did not match the expected shape
    Decode,
    Unknown,
}

impl SearchErrorKind {
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Network | Self::ServerError)
    }
}
