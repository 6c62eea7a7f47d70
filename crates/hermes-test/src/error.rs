//! Test error types.

use thiserror::Error;

/// Errors that can occur while inspecting dispatch results.
#[derive(Debug, Error)]
pub enum TestError {
    /// Response body was not what was expected.
    #[error("body read error: {0}")]
    BodyRead(String),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The completion callback was never invoked.
    #[error("no response was delivered")]
    NotDelivered,
}
