//! Request ID propagation.
//!
//! Writes the dispatch's request ID into the `x-request-id` response header
//! so callers can correlate responses with server logs. The header is set in
//! the pre-call, so it is present on responses from aborted chains as well as
//! on handler responses.

use hermes_core::{BoxFuture, InvocationContext};
use http::{HeaderName, HeaderValue};

use crate::interceptor::{Flow, Interceptor};

/// The header name for request ID propagation.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Interceptor that echoes the request ID on the response.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestIdInterceptor;

impl RequestIdInterceptor {
    /// Creates the interceptor.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Interceptor for RequestIdInterceptor {
    fn name(&self) -> &str {
        "request_id"
    }

    fn pre_call<'a>(
        &'a self,
        ctx: &'a mut InvocationContext,
    ) -> BoxFuture<'a, anyhow::Result<Flow>> {
        Box::pin(async move {
            let value = HeaderValue::from_str(&ctx.request_id().to_string())?;
            ctx.response_mut()
                .headers_mut()
                .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
            Ok(Flow::Continue)
        })
    }
}
