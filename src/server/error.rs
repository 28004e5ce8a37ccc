//! Error types for the test server.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

use crate::parser::Error as ParserError;

/// Errors that can occur while running the test server.
#[derive(Debug, Error)]
pub enum Error {
    /// Error parsing an HTTP request.
    #[error("Parse error: {0}")]
    ParseError(#[from] ParserError),

    /// I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The listener could not be bound within the retry budget.
    #[error("Failed to bind {addr} after {attempts} attempts: {source}")]
    BindError {
        addr: SocketAddr,
        attempts: u32,
        #[source]
        source: std::io::Error,
    },

    /// The embedded certificate or key could not be loaded.
    #[error("TLS credential error: {0}")]
    CredentialError(String),

    /// rustls rejected the configuration or the handshake.
    #[error("TLS error: {0}")]
    TlsError(#[from] rustls::Error),

    /// An encoded response body was not valid base64.
    #[error("Decoding error: {0}")]
    DecodingError(#[from] base64::DecodeError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// The peer did not deliver a request in time.
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// The request exceeded the configured size limit.
    #[error("Request exceeds {0} bytes")]
    RequestTooLarge(usize),

    /// A URI could not be used to reach the server.
    #[error("Invalid URI: {0}")]
    InvalidUri(String),

    /// A response read back from the server could not be parsed.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The shutdown request did not complete as expected.
    #[error("Shutdown failed: {0}")]
    ShutdownError(String),

    /// The accept loop task panicked or was cancelled.
    #[error("Accept loop task failed: {0}")]
    JoinError(#[from] tokio::task::JoinError),
}
