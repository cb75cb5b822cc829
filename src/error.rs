//! Unified error types for agentdetect

use thiserror::Error;

/// Unified Result type
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for agentdetect
///
/// No variant of this enum ever escapes the engine's public surface:
/// entry points contain failures, log them at debug level and degrade to
/// the benign case.
#[derive(Error, Debug)]
pub enum Error {
    /// A fingerprint sub-probe raised
    #[error("Probe failed: {0}")]
    Probe(String),

    /// The tab-persistent store is unavailable or rejected a write
    #[error("Storage error: {0}")]
    Storage(String),

    /// A single mutation record triggered an exception during analysis
    #[error("Mutation analysis error: {0}")]
    Mutation(String),

    /// The outbound RPC or beacon failed
    #[error("Transport error: {0}")]
    Transport(String),

    /// Invalid or missing configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Operation timeout
    #[error("Operation timeout: {0}")]
    Timeout(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new probe error
    pub fn probe<S: Into<String>>(msg: S) -> Self {
        Error::Probe(msg.into())
    }

    /// Create a new storage error
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        Error::Storage(msg.into())
    }

    /// Create a new mutation analysis error
    pub fn mutation<S: Into<String>>(msg: S) -> Self {
        Error::Mutation(msg.into())
    }

    /// Create a new transport error
    pub fn transport<S: Into<String>>(msg: S) -> Self {
        Error::Transport(msg.into())
    }

    /// Create a new configuration error
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        Error::Configuration(msg.into())
    }

    /// Create a new timeout error
    pub fn timeout<S: Into<String>>(msg: S) -> Self {
        Error::Timeout(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Error::Internal(msg.into())
    }
}
