//! Core types for the Hermes request dispatcher.
//!
//! This crate defines the vocabulary shared by every other Hermes crate:
//!
//! - [`MediaType`] and `Accept` parsing
//! - [`Request`] with a buffered or chunked [`Body`]
//! - [`Response`] and the single-shot [`CompletionCallback`]
//! - the [`Handler`] abstraction with its [`InvocationMode`]
//! - the per-dispatch [`InvocationContext`]
//! - the error taxonomy rooted at [`DispatchError`]

#![doc(html_root_url = "https://docs.rs/hermes-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod context;
pub mod error;
pub mod handler;
mod invocation;
pub mod media;
mod request;
mod response;

pub use context::RequestId;
pub use error::{
    DispatchError, ErrorCategory, HandlerError, HandlerResult, InterceptorFailure,
    InterceptorPhase, RouteError,
};
pub use handler::{
    BoxFuture, BufferedHandler, FnHandler, Handler, HandlerRequest, InvocationMode,
    StreamSession, StreamingHandler,
};
pub use invocation::{InvocationContext, InvocationContextBuilder};
pub use media::{Accept, ContentType, MediaType, MediaTypeError};
pub use request::{Body, BodyError, ChunkStream, Request, RequestBuilder};
pub use response::{CompletionCallback, Response};

pub use hermes_router::Params;
