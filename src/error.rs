//! Error types for the Skyhash client
//!
//! Protocol-level failures live in [`ParseError`]; everything a caller can
//! observe is wrapped in [`SkyError`].

use thiserror::Error;

use crate::protocol::{ParseError, ResponseCode};

/// Result type alias using SkyError
pub type Result<T> = std::result::Result<T, SkyError>;

/// Unified error type for client operations
#[derive(Debug, Error)]
pub enum SkyError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    #[error("Protocol error: {0}")]
    Parse(#[from] ParseError),

    // -------------------------------------------------------------------------
    // Connection Errors
    // -------------------------------------------------------------------------
    #[error("Connection reset by peer")]
    ConnectionReset,

    #[error("Not connected")]
    NotConnected,

    #[error("Connection desynchronized by an earlier protocol error; reconnect")]
    Desynchronized,

    // -------------------------------------------------------------------------
    // Usage Errors
    // -------------------------------------------------------------------------
    #[error("A query cannot be empty")]
    EmptyQuery,

    #[error("A pipeline cannot be empty")]
    EmptyPipeline,

    // -------------------------------------------------------------------------
    // Response Mapping Errors
    // -------------------------------------------------------------------------
    #[error("Server responded with {0}")]
    Response(ResponseCode),

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl SkyError {
    /// Whether this error means the transport is gone
    pub fn is_connection_error(&self) -> bool {
        matches!(self, SkyError::ConnectionReset | SkyError::NotConnected | SkyError::Io(_))
    }
}
