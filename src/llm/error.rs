//! LLM error types

use reqwest::StatusCode;
use thiserror::Error;

/// Model call failure with classification
#[derive(Debug, Error)]
#[error("{message}")]
pub struct LlmError {
    pub kind: LlmErrorKind,
    pub message: String,
}

impl LlmError {
    pub fn new(kind: LlmErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::Network, message)
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::Auth, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::Unknown, message)
    }

    /// Classify a non-success HTTP status from the provider
    pub fn from_status(status: StatusCode, detail: &str) -> Self {
        let (kind, label) = match status.as_u16() {
            400 => (LlmErrorKind::InvalidRequest, "Invalid request"),
            401 | 403 => (LlmErrorKind::Auth, "Authentication failed"),
            429 => (LlmErrorKind::RateLimit, "Rate limit exceeded"),
            500..=599 => (LlmErrorKind::ServerError, "Server error"),
            _ => (LlmErrorKind::Unknown, "Unexpected status"),
        };
        Self::new(kind, format!("{label} (HTTP {}): {detail}", status.as_u16()))
    }

    /// Classify a transport failure
    pub fn from_transport(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::network(format!("Request timeout: {err}"))
        } else if err.is_connect() {
            Self::network(format!("Connection failed: {err}"))
        } else {
            Self::unknown(format!("Request failed: {err}"))
        }
    }
}

/// Error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmErrorKind {
    /// Network issues, timeouts
    Network,
    /// Rate limited (429)
    RateLimit,
    /// Server error (5xx)
    ServerError,
    /// Authentication failed (401, 403)
    Auth,
    /// Bad request (400)
    InvalidRequest,
    Unknown,
}

impl LlmErrorKind {
    /// Whether trying again later could succeed. The console never retries on
    /// its own; this only feeds logging.
    pub fn is_transient(self) -> bool {
        matches!(self, Self::Network | Self::RateLimit | Self::ServerError)
    }
}
