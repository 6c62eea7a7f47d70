//! Registration errors.

use hermes_core::MediaTypeError;
use hermes_router::TemplateError;
use thiserror::Error;

/// Errors raised while building resource methods and routing tables.
///
/// These surface at registration time, never during dispatch.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The route template did not parse.
    #[error("invalid route template for '{operation}'")]
    Template {
        /// Operation being registered.
        operation: String,
        /// Parse failure.
        #[source]
        source: TemplateError,
    },

    /// A consumes or produces entry is not a media type.
    #[error("invalid media type for '{operation}'")]
    MediaType {
        /// Operation being registered.
        operation: String,
        /// Parse failure.
        #[source]
        source: MediaTypeError,
    },

    /// No handler was supplied.
    #[error("resource method '{0}' has no handler")]
    MissingHandler(String),

    /// The same operation name was registered twice.
    #[error("operation '{0}' is already registered")]
    DuplicateOperation(String),
}

/// Result type for registration.
pub type RegistryResult<T> = Result<T, RegistryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RegistryError::MissingHandler("getUser".to_string());
        assert_eq!(err.to_string(), "resource method 'getUser' has no handler");

        let err = RegistryError::DuplicateOperation("getUser".to_string());
        assert!(err.to_string().contains("already registered"));
    }
}
