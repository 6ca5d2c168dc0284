//! Error types for the request-dispatch layer.
//!
//! # Design
//! Three failures are terminal for a call: the timer beat the network
//! (`Timeout`), the network primitive itself failed (`Transport`), or a body
//! that had to be JSON was not (`Decode`). None of them is caught or retried
//! inside the crate. A non-2xx status is not an error at all; it is returned
//! as text by the interpreter.

use std::error::Error as StdError;

use thiserror::Error;

/// Errors surfaced by `ConsoleFetch` calls.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The timer fired before the network operation settled.
    #[error("Call to {url} timed out after {timeout_ms}ms.")]
    Timeout { url: String, timeout_ms: i64 },

    /// DNS failure, refused or aborted connection, or a failed body read.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A response that had to be decoded as JSON was not valid JSON.
    #[error("failed to decode response body as JSON: {0}")]
    Decode(#[source] serde_json::Error),

    /// The request body could not be encoded; nothing was sent.
    #[error("failed to encode request body as JSON: {0}")]
    Serialize(#[source] serde_json::Error),

    /// Configuration could not be read or parsed.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl FetchError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Timeout { .. })
    }
}

/// Failure reported by a `Transport`.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct TransportError {
    message: String,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
