//! Telemetry error types.

use thiserror::Error;

/// Errors that can occur while installing telemetry.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The metrics recorder could not be built or installed.
    #[error("failed to initialize metrics: {0}")]
    MetricsInit(String),

    /// The global subscriber could not be installed.
    #[error("failed to initialize logging: {0}")]
    LoggingInit(String),

    /// The log filter directive does not parse.
    #[error("invalid log filter '{directive}': {reason}")]
    InvalidFilter {
        /// The rejected directive.
        directive: String,
        /// Parser message.
        reason: String,
    },

    /// The metrics listen address is not a socket address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),
}
