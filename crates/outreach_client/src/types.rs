use std::fmt;

use outreach_core::ShapeError;
use thiserror::Error;

/// Fallback used when a failed response carries no readable message.
pub const FALLBACK_ERROR_MESSAGE: &str = "request failed";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Missing or rejected credentials (HTTP 401/403).
    #[error("authentication rejected ({status}): {message}")]
    Auth { status: u16, message: String },
    /// A local precondition failed before any request was sent.
    #[error("configuration missing: {0}")]
    Configuration(String),
    /// The request never reached the server or no response came back.
    #[error("{kind}: {message}")]
    Network {
        kind: NetworkFailure,
        message: String,
    },
    /// The server answered with a failure status.
    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },
    /// The server answered 200 but the body matched no known layout.
    #[error(transparent)]
    Shape(#[from] ShapeError),
    #[error("request body could not be encoded: {0}")]
    Encode(String),
}

impl ApiError {
    pub(crate) fn network(kind: NetworkFailure, message: impl Into<String>) -> Self {
        ApiError::Network {
            kind,
            message: message.into(),
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(self, ApiError::Network { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkFailure {
    InvalidUrl,
    Connect,
    Timeout,
    Other,
}

impl fmt::Display for NetworkFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkFailure::InvalidUrl => write!(f, "invalid url"),
            NetworkFailure::Connect => write!(f, "connection failed"),
            NetworkFailure::Timeout => write!(f, "timeout"),
            NetworkFailure::Other => write!(f, "network error"),
        }
    }
}
