//! Error taxonomy for the external model backends.
//!
//! Every variant is recoverable: callers convert these into degraded
//! results (a chunk stored without an embedding, a generation stage that
//! defers to the next one) and log them. None of them ever reach the user.

use thiserror::Error;

/// Failure to produce an embedding vector.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EmbeddingError {
    /// The provider is disabled or failed to initialize.
    #[error("embedding provider unavailable: {0}")]
    Unavailable(String),

    #[error("embedding request failed: {0}")]
    Request(String),

    #[error("invalid embedding response: {0}")]
    InvalidResponse(String),

    #[error("embedding has {actual} dimensions, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Failure to generate a reply.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenerationError {
    #[error("no generation backend configured")]
    NotConfigured,

    /// HTTP 401/403 from the backend.
    #[error("generation backend rejected credentials: {0}")]
    Unauthorized(String),

    /// HTTP 429 from the backend.
    #[error("generation backend rate limited: {0}")]
    RateLimited(String),

    #[error("generation request failed: {0}")]
    Request(String),

    #[error("invalid generation response: {0}")]
    InvalidResponse(String),

    #[error("generation backend returned empty text")]
    EmptyResponse,
}
