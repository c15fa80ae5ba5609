//! Error type for the todo API client.
//!
//! # Design
//! Every failed call surfaces as one opaque "request failed" message: the
//! server's error text, or `HTTP <status>` when the body is empty. Variants
//! only record where the failure happened; `Display` prints the bare message
//! in every case, so callers never branch on not-found vs. validation.

use thiserror::Error;

/// Errors returned by `TodoClient` parse methods, transports, and the query
/// layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The server answered with a non-2xx status.
    #[error("{message}")]
    Http { status: u16, message: String },

    /// The request never produced a response (connection refused, DNS, ...).
    #[error("{0}")]
    Transport(String),

    /// The request payload could not be serialized to JSON.
    #[error("{0}")]
    Serialization(String),

    /// The response body could not be deserialized into the expected type.
    #[error("{0}")]
    Deserialization(String),
}

impl ApiError {
    /// Build the error for a non-2xx response from its status and body.
    pub fn from_status(status: u16, body: &str) -> Self {
        let trimmed = body.trim();
        let message = if trimmed.is_empty() {
            format!("HTTP {status}")
        } else {
            trimmed.to_string()
        };
        ApiError::Http { status, message }
    }

    /// The user-facing message.
    pub fn message(&self) -> &str {
        match self {
            ApiError::Http { message, .. } => message,
            ApiError::Transport(msg)
            | ApiError::Serialization(msg)
            | ApiError::Deserialization(msg) => msg,
        }
    }

    /// The HTTP status, when the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}
