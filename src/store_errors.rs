//! # Store Error Types Module
//!
//! Error taxonomy for the order store and its key-value backends. Any of
//! these aborts the request that hit it; the webhook turns them into an
//! HTTP failure instead of a chat reply.

/// Custom error types for order store operations
#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    /// Backend could not be reached (connection refused, dropped socket)
    Connection(String),
    /// A single store call exceeded the configured bound
    Timeout(String),
    /// Backend answered with an error (wrong type, bad reply)
    Backend(String),
    /// Invalid backend configuration (bad URL)
    Configuration(String),
}

impl StoreError {
    /// Whether the backend is unavailable, as opposed to misbehaving
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Connection(_) | StoreError::Timeout(_))
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Connection(msg) => write!(f, "Store connection error: {msg}"),
            StoreError::Timeout(msg) => write!(f, "Store timeout: {msg}"),
            StoreError::Backend(msg) => write!(f, "Store backend error: {msg}"),
            StoreError::Configuration(msg) => write!(f, "Store configuration error: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_connection_refusal() || err.is_connection_dropped() || err.is_io_error() {
            StoreError::Connection(err.to_string())
        } else if err.is_timeout() {
            StoreError::Timeout(err.to_string())
        } else {
            StoreError::Backend(err.to_string())
        }
    }
}
