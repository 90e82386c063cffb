//! Error types for aitax-widget
//!
//! Adapters and transports report typed errors; the identify dispatcher
//! collapses every one of them into the user-visible message string carried
//! by `IdentifyState::Error`.

use thiserror::Error;

/// Backend adapter errors (request construction and response parsing)
#[derive(Debug, Error)]
pub enum AdapterError {
    /// API URL cannot be extended with the backend's path
    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),

    /// Backend reported an application-level error using its own convention
    #[error("{}", backend_message(.status.as_deref(), .message))]
    Backend {
        /// HTTP status text, present when the exchange was not 2xx
        status: Option<String>,
        message: String,
    },

    /// Non-2xx HTTP status without a recognizable error body
    #[error("Identification request failed: {status} {reason}")]
    Http { status: u16, reason: String },

    /// Response body does not match the backend's JSON schema
    #[error("Failed to parse {backend} response: {detail}")]
    Parse {
        backend: &'static str,
        detail: String,
    },
}

fn backend_message(status: Option<&str>, message: &str) -> String {
    match status {
        Some(status) => format!("{}: {}", status, message),
        None => message.to_string(),
    }
}

/// Network exchange errors
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("{0}")]
    Request(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout(e.to_string())
        } else if e.is_connect() {
            TransportError::Connect(e.to_string())
        } else {
            TransportError::Request(e.to_string())
        }
    }
}
