//! Error taxonomy for the completion pipeline
//!
//! - [`TransportError`]: the connection itself failed (bind, handshake, drop).
//!   Clients surface this as a persistent "not connected" state.
//! - [`ProtocolError`]: a payload could not be decoded. Logged and answered
//!   with a generic failure message.
//! - [`LookupError`]: the vocabulary store failed. Answered with a failure
//!   message that is distinct from an empty suggestion list.
//!
//! Stale responses are not errors; the client drops them silently.

use thiserror::Error;

/// Failure while querying the vocabulary store
#[derive(Debug, Error)]
pub enum LookupError {
    /// The store is unreachable or refused the query
    #[error("vocabulary store unavailable: {0}")]
    Unavailable(String),

    /// The prefix pattern could not be compiled
    #[error("invalid prefix pattern {pattern:?}: {reason}")]
    InvalidPattern {
        pattern: String,
        reason: &'static str,
    },
}

/// Malformed payload received on the session channel
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("payload is not valid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("payload is not a valid message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("payload is not a JSON object")]
    NotAnObject,
}

/// Connection-level failure
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to accept connection: {0}")]
    Accept(#[source] std::io::Error),

    #[error("websocket error: {0}")]
    WebSocket(#[from] Box<tokio_tungstenite::tungstenite::Error>),

    #[error("session closed")]
    Closed,
}

impl From<tokio_tungstenite::tungstenite::Error> for TransportError {
    fn from(error: tokio_tungstenite::tungstenite::Error) -> Self {
        TransportError::WebSocket(Box::new(error))
    }
}
