//! Error types for Parley
//!
//! This module defines the error types used throughout the application,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for Parley operations
///
/// Covers configuration loading, completion requests, stream consumption,
/// history persistence, and session lookups.
#[derive(Error, Debug)]
pub enum ParleyError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Completion client errors (request construction, non-success status)
    #[error("Client error: {0}")]
    Client(String),

    /// Errors raised while a completion stream is being consumed
    #[error("Stream error: {0}")]
    Stream(String),

    /// Chat history storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// No session matches the given identifier or prefix
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// More than one session matches the given prefix
    #[error("Ambiguous session id prefix: {0}")]
    AmbiguousSession(String),

    /// Missing API key for the completion endpoint
    #[error("Missing API key: set api.api_key in the config file or PARLEY_API_KEY")]
    MissingApiKey,

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for Parley operations
///
/// Uses `anyhow::Error` so callers can attach context while propagating.
pub type Result<T> = anyhow::Result<T>;
