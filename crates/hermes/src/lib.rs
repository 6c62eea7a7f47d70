//! # Hermes
//!
//! **In-process HTTP request dispatcher**
//!
//! Hermes takes an already-parsed request, finds the resource method that
//! should serve it and runs it, delivering exactly one response through a
//! completion callback:
//!
//! - **Path routing** – literal and `{variable}` segments, optional regex
//!   constraints, literal segments win over variables
//! - **Content negotiation** – `consumes`/`produces` media types checked
//!   against `Content-Type` and `Accept`, with standard 415/406 answers
//! - **Interceptors** – ordered pre/post hooks that can abort a dispatch
//! - **Buffered or streaming invocation** – whole body at once, or chunk
//!   by chunk through a start/chunk/end session
//! - **Observability** – a `dispatch` span per request and Prometheus
//!   dispatch metrics
//!
//! ## Quick Start
//!
//! ```
//! use hermes::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = Registry::builder()
//!     .resource(
//!         ResourceMethod::builder(Method::GET, "/users/{id}")
//!             .operation("getUser")
//!             .produces("application/json")
//!             .handler(Handler::buffered_fn(|req| async move {
//!                 let id = req.param("id").unwrap_or_default().to_string();
//!                 Response::json(&serde_json::json!({ "id": id })).map_err(HandlerError::other)
//!             }))
//!             .build()?,
//!     )
//!     .interceptor(RequestIdInterceptor::new())
//!     .build()?;
//!
//! let dispatcher = Dispatcher::new(registry);
//! let request = Request::builder().uri("/users/7").body(Body::empty())?;
//! let response = tokio_test::block_on(dispatcher.dispatch_response(request));
//!
//! assert_eq!(response.status(), StatusCode::OK);
//! assert_eq!(response.body().as_ref(), br#"{"id":"7"}"#);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Request → route → negotiate → pre-calls → handler → post-calls → CompletionCallback
//!              ↓          ↓           ↓          ↓          ↓
//!             404/405    415/406    abort/500  failure/500   500
//! ```

#![doc(html_root_url = "https://docs.rs/hermes/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use hermes_core as core;

// Re-export router types
pub use hermes_router as router;

// Re-export interceptor types
pub use hermes_interceptor as interceptor;

// Re-export dispatcher types
pub use hermes_dispatcher as dispatcher;

// Re-export configuration
pub use hermes_config as config;

// Re-export telemetry
pub use hermes_telemetry as telemetry;

/// Prelude module for convenient imports.
///
/// ```
/// use hermes::prelude::*;
///
/// let dispatcher = Dispatcher::new(Registry::default());
/// assert!(dispatcher.registry().table().is_empty());
/// ```
pub mod prelude {
    pub use hermes_core::{
        Accept, Body, BoxFuture, BufferedHandler, CompletionCallback, ContentType, DispatchError,
        Handler, HandlerError, HandlerRequest, HandlerResult, InvocationContext, InvocationMode,
        MediaType, Request, RequestId, Response, RouteError, StreamSession, StreamingHandler,
    };

    // Re-export dispatcher types
    pub use hermes_dispatcher::{
        Dispatcher, DispatcherOptions, Registry, RegistryBuilder, RegistryError,
        ResourceMethod,
    };

    // Re-export interceptor types
    pub use hermes_interceptor::{Flow, Interceptor, RequestIdInterceptor};

    // Re-export configuration
    pub use hermes_config::{ConfigLoader, HermesConfig};

    // HTTP vocabulary used throughout the API
    pub use http::{Method, StatusCode};
}
