//! The interceptor trait.
//!
//! An interceptor is a cross-cutting hook with two optional capabilities:
//! a pre-call that may veto the handler, and a post-call that observes the
//! final status. Both default to no-ops, so an implementation only writes the
//! phase it cares about.
//!
//! # Example
//!
//! ```
//! use hermes_core::{BoxFuture, InvocationContext, Response};
//! use hermes_interceptor::{Flow, Interceptor};
//! use http::StatusCode;
//!
//! struct RequireTenant;
//!
//! impl Interceptor for RequireTenant {
//!     fn name(&self) -> &str {
//!         "require_tenant"
//!     }
//!
//!     fn pre_call<'a>(
//!         &'a self,
//!         ctx: &'a mut InvocationContext,
//!     ) -> BoxFuture<'a, anyhow::Result<Flow>> {
//!         Box::pin(async move {
//!             if ctx.header("x-tenant").is_some() {
//!                 return Ok(Flow::Continue);
//!             }
//!             ctx.response_mut().merge(Response::empty(StatusCode::BAD_REQUEST));
//!             Ok(Flow::Abort)
//!         })
//!     }
//! }
//! ```

use hermes_core::{BoxFuture, InvocationContext};
use http::StatusCode;

/// Outcome of a pre-call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Run the next pre-call, or the handler after the last one.
    Continue,
    /// Stop here. The handler and post-calls are skipped and the response
    /// in the context is delivered as it stands.
    Abort,
}

/// A cross-cutting hook run around handler invocation.
///
/// Errors returned from either phase stop the rest of that phase and are
/// reported as an interceptor failure, distinct from handler failures.
pub trait Interceptor: Send + Sync + 'static {
    /// Name used in logs, metrics and failure reports.
    fn name(&self) -> &str;

    /// Runs before the handler, in registration order.
    fn pre_call<'a>(
        &'a self,
        ctx: &'a mut InvocationContext,
    ) -> BoxFuture<'a, anyhow::Result<Flow>> {
        let _ = ctx;
        Box::pin(async { Ok(Flow::Continue) })
    }

    /// Runs after a handler that returned normally, in registration order,
    /// with the final status.
    fn post_call<'a>(
        &'a self,
        ctx: &'a mut InvocationContext,
        status: StatusCode,
    ) -> BoxFuture<'a, anyhow::Result<()>> {
        let _ = (ctx, status);
        Box::pin(async { Ok(()) })
    }
}
