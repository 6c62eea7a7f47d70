//! Interceptor chain for Hermes.
//!
//! Interceptors run around handler invocation: every pre-call in registration
//! order, then the handler, then every post-call in registration order with
//! the final status. Any pre-call may abort the dispatch, in which case the
//! handler and all post-calls are skipped.
//!
//! - [`Interceptor`] - the hook trait, both phases optional
//! - [`InterceptorChain`] - the immutable ordered registration list
//! - [`InterceptorExecutor`] - per-dispatch state machine over a chain

#![doc(html_root_url = "https://docs.rs/hermes-interceptor/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod chain;
pub mod interceptor;
pub mod stages;

pub use chain::{
    BoxedInterceptor, ChainError, ChainState, InterceptorChain, InterceptorChainBuilder,
    InterceptorExecutor,
};
pub use interceptor::{Flow, Interceptor};
pub use stages::{RequestIdInterceptor, REQUEST_ID_HEADER};

pub use hermes_core::{InterceptorFailure, InterceptorPhase};
