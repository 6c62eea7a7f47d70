//! Request dispatching for Hermes.
//!
//! Given an already-parsed [`Request`](hermes_core::Request), the
//! [`Dispatcher`] selects one registered [`ResourceMethod`], negotiates the
//! response media type, runs the interceptor chain around the handler and
//! delivers exactly one response through a
//! [`CompletionCallback`](hermes_core::CompletionCallback).
//!
//! - [`RoutingTable`] - registered resource methods and the matcher
//! - [`negotiate`] - response media type selection
//! - [`invoke`] / [`StreamingInvocation`] - buffered and streaming invocation
//! - [`framing`] - `Connection` header handling
//! - [`Dispatcher`] / [`Registry`] - orchestration over a swappable registry

#![doc(html_root_url = "https://docs.rs/hermes-dispatcher/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod dispatcher;
mod error;
pub mod framing;
mod invoker;
mod negotiation;
mod resource;
mod table;

pub use dispatcher::{Dispatcher, DispatcherOptions, Registry, RegistryBuilder};
pub use error::{RegistryError, RegistryResult};
pub use invoker::{invoke, InvokeError, StreamState, StreamingInvocation};
pub use negotiation::negotiate;
pub use resource::{ResourceMethod, ResourceMethodBuilder};
pub use table::{Destination, RoutingTable};
