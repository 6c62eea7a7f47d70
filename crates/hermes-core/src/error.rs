//! Error types for Hermes.
//!
//! Every failure of a dispatch ends up as a [`DispatchError`], which falls in
//! exactly one [`ErrorCategory`]:
//!
//! | Category | Source | Response |
//! |---|---|---|
//! | `Routing` | [`RouteError`] | 404 / 405 / 415 / 406, empty body |
//! | `Business` | [`HandlerError::Failure`] | the handler's response, verbatim |
//! | `Interceptor` | [`InterceptorFailure`] | 500, empty body |
//! | `Unmapped` | anything else | 500, empty body |
//!
//! Failure details are for logs only; they never reach the response body.

use std::fmt;

use http::header::ALLOW;
use http::{HeaderValue, Method, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::request::BodyError;
use crate::response::Response;

/// Result type returned by handlers.
pub type HandlerResult<T = ()> = Result<T, HandlerError>;

/// The four outcomes a failed dispatch can have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// No match, wrong method, unsupported or unacceptable media type.
    Routing,
    /// The handler failed with its own response.
    Business,
    /// A pre- or post-call interceptor failed.
    Interceptor,
    /// Anything else, including panics.
    Unmapped,
}

impl ErrorCategory {
    /// Stable lowercase name, used as a metrics label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Routing => "routing",
            Self::Business => "business",
            Self::Interceptor => "interceptor",
            Self::Unmapped => "unmapped",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Routing and negotiation failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// No template matches the path.
    #[error("no route for path '{path}'")]
    NotFound {
        /// The request path.
        path: String,
    },

    /// A template matches but no resource method accepts the HTTP method.
    #[error("method {method} not allowed for path '{path}'")]
    MethodNotAllowed {
        /// The request method.
        method: Method,
        /// The request path.
        path: String,
        /// Methods registered for templates matching the path.
        allowed: Vec<Method>,
    },

    /// No resource method consumes the request content type.
    #[error("unsupported media type '{content_type}'")]
    UnsupportedMediaType {
        /// The request content type.
        content_type: String,
    },

    /// No resource method produces anything the caller accepts.
    #[error("none of the acceptable media types [{accept}] can be produced")]
    NotAcceptable {
        /// The caller's accept list, comma separated.
        accept: String,
    },
}

impl RouteError {
    /// HTTP status for this failure.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            Self::UnsupportedMediaType { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::NotAcceptable { .. } => StatusCode::NOT_ACCEPTABLE,
        }
    }
}

/// Interceptor phase in which a failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterceptorPhase {
    /// Before the handler.
    PreCall,
    /// After the handler.
    PostCall,
}

impl fmt::Display for InterceptorPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::PreCall => "pre-call",
            Self::PostCall => "post-call",
        })
    }
}

/// An interceptor failed.
///
/// The chain stops and the caller receives a generic 500; `source` is logged.
#[derive(Debug, Error)]
#[error("interceptor '{interceptor}' failed in {phase}")]
pub struct InterceptorFailure {
    interceptor: String,
    phase: InterceptorPhase,
    #[source]
    source: anyhow::Error,
}

impl InterceptorFailure {
    /// Creates a failure for `interceptor` in `phase`.
    pub fn new(
        interceptor: impl Into<String>,
        phase: InterceptorPhase,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self {
            interceptor: interceptor.into(),
            phase,
            source: source.into(),
        }
    }

    /// Name of the failing interceptor.
    #[must_use]
    pub fn interceptor(&self) -> &str {
        &self.interceptor
    }

    /// Phase the failure occurred in.
    #[must_use]
    pub fn phase(&self) -> InterceptorPhase {
        self.phase
    }

    /// Underlying cause.
    #[must_use]
    pub fn cause(&self) -> &anyhow::Error {
        &self.source
    }
}

/// What a handler returns when it does not complete normally.
///
/// # Example
///
/// ```
/// use hermes_core::{DispatchError, ErrorCategory, HandlerError, Response};
/// use http::StatusCode;
///
/// let conflict = HandlerError::failure(
///     Response::empty(StatusCode::CONFLICT).with_body("version mismatch"),
/// );
/// let error = DispatchError::from(conflict);
/// assert_eq!(error.category(), ErrorCategory::Business);
/// assert_eq!(error.status_code(), StatusCode::CONFLICT);
///
/// // One level of wrapping is looked through.
/// let wrapped = HandlerError::failure(Response::empty(StatusCode::GONE)).wrap();
/// assert_eq!(DispatchError::from(wrapped).status_code(), StatusCode::GONE);
/// ```
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Intentional failure carrying the response to deliver as-is.
    #[error("business failure ({})", .0.status())]
    Failure(Box<Response>),

    /// A failure wrapped by invocation plumbing.
    #[error("invocation failed")]
    Wrapped(#[source] Box<HandlerError>),

    /// Any other failure.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl HandlerError {
    /// A business failure delivering `response` verbatim.
    #[must_use]
    pub fn failure(response: Response) -> Self {
        Self::Failure(Box::new(response))
    }

    /// An unmapped failure from any error type.
    pub fn other(error: impl Into<anyhow::Error>) -> Self {
        Self::Other(error.into())
    }

    /// Wraps this error one level deeper.
    #[must_use]
    pub fn wrap(self) -> Self {
        Self::Wrapped(Box::new(self))
    }
}

impl From<BodyError> for HandlerError {
    fn from(error: BodyError) -> Self {
        Self::Other(error.into())
    }
}

/// The single failure channel of a dispatch.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Routing or negotiation failed.
    #[error(transparent)]
    Routing(#[from] RouteError),

    /// The handler failed with its own response.
    #[error("business failure ({})", .0.status())]
    Business(Box<Response>),

    /// An interceptor failed.
    #[error(transparent)]
    Interceptor(#[from] InterceptorFailure),

    /// Any other failure.
    #[error("unmapped failure: {0}")]
    Unmapped(#[source] anyhow::Error),
}

impl DispatchError {
    /// An unmapped failure from any error type.
    pub fn unmapped(error: impl Into<anyhow::Error>) -> Self {
        Self::Unmapped(error.into())
    }

    /// Category of this failure.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::Routing(_) => ErrorCategory::Routing,
            Self::Business(_) => ErrorCategory::Business,
            Self::Interceptor(_) => ErrorCategory::Interceptor,
            Self::Unmapped(_) => ErrorCategory::Unmapped,
        }
    }

    /// Status of the response this failure maps to.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Routing(e) => e.status_code(),
            Self::Business(response) => response.status(),
            Self::Interceptor(_) | Self::Unmapped(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The response to deliver for this failure.
    ///
    /// A 405 carries an `Allow` header listing the registered methods.
    #[must_use]
    pub fn into_response(self) -> Response {
        match self {
            Self::Business(response) => *response,
            Self::Routing(RouteError::MethodNotAllowed { allowed, .. }) => {
                let mut response = Response::empty(StatusCode::METHOD_NOT_ALLOWED);
                let allow = allowed
                    .iter()
                    .map(Method::as_str)
                    .collect::<Vec<_>>()
                    .join(", ");
                if let Ok(value) = HeaderValue::from_str(&allow) {
                    response.headers_mut().insert(ALLOW, value);
                }
                response
            }
            other => Response::empty(other.status_code()),
        }
    }
}

impl From<HandlerError> for DispatchError {
    /// Classifies a handler error, looking through exactly one level of
    /// wrapping.
    fn from(error: HandlerError) -> Self {
        match error {
            HandlerError::Failure(response) => Self::Business(response),
            HandlerError::Wrapped(inner) => match *inner {
                HandlerError::Failure(response) => Self::Business(response),
                HandlerError::Other(e) => Self::Unmapped(e),
                nested @ HandlerError::Wrapped(_) => Self::Unmapped(anyhow::Error::new(nested)),
            },
            HandlerError::Other(e) => Self::Unmapped(e),
        }
    }
}
