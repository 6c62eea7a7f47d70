//! Handler abstraction.
//!
//! A resource method is served by a [`Handler`], which is either buffered
//! (the whole body in one call) or streaming (a start signal, every chunk in
//! order, then an end signal). The mode is fixed when the handler is
//! registered and never chosen per request.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use http::{HeaderMap, Method, Uri};

use crate::error::HandlerResult;
use crate::invocation::InvocationContext;
use crate::media::MediaType;
use crate::response::Response;
use hermes_router::Params;

/// A boxed, `Send` future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// How a handler receives the request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum InvocationMode {
    /// One call with the whole body.
    #[default]
    Buffered,
    /// `open`, then `chunk` per chunk, then `end`.
    Streaming,
}

/// A handler that receives the whole request body at once.
///
/// The handler writes its result into [`InvocationContext::response_mut`].
pub trait BufferedHandler: Send + Sync + 'static {
    /// Handles one request.
    fn call<'a>(
        &'a self,
        ctx: &'a mut InvocationContext,
        body: Bytes,
    ) -> BoxFuture<'a, HandlerResult>;
}

/// A handler that consumes the request body incrementally.
pub trait StreamingHandler: Send + Sync + 'static {
    /// The start signal. Returns the session that will receive the chunks of
    /// this request.
    fn open<'a>(
        &'a self,
        ctx: &'a mut InvocationContext,
    ) -> BoxFuture<'a, HandlerResult<Box<dyn StreamSession>>>;
}

/// Per-request state of a streaming handler.
///
/// Calls are strictly sequential: each `chunk` completes before the next one
/// starts, and `end` is called once after the last chunk.
pub trait StreamSession: Send {
    /// Receives the next body chunk.
    fn chunk<'a>(
        &'a mut self,
        ctx: &'a mut InvocationContext,
        chunk: Bytes,
    ) -> BoxFuture<'a, HandlerResult>;

    /// The body is complete.
    fn end<'a>(&'a mut self, ctx: &'a mut InvocationContext) -> BoxFuture<'a, HandlerResult>;
}

/// A registered handler and its invocation mode.
#[derive(Clone)]
pub enum Handler {
    /// Whole-body handler.
    Buffered(Arc<dyn BufferedHandler>),
    /// Chunked handler.
    Streaming(Arc<dyn StreamingHandler>),
}

impl Handler {
    /// Wraps a buffered handler.
    pub fn buffered(handler: impl BufferedHandler) -> Self {
        Self::Buffered(Arc::new(handler))
    }

    /// Wraps a streaming handler.
    pub fn streaming(handler: impl StreamingHandler) -> Self {
        Self::Streaming(Arc::new(handler))
    }

    /// A buffered handler from an async closure.
    ///
    /// The closure receives a [`HandlerRequest`] snapshot and returns the
    /// response. A response left at media type `*/*` picks up the negotiated
    /// type.
    ///
    /// # Example
    ///
    /// ```
    /// use hermes_core::{Handler, InvocationMode, Response};
    ///
    /// let handler = Handler::buffered_fn(|req| async move {
    ///     let id = req.param("id").unwrap_or("unknown").to_string();
    ///     Ok(Response::new().with_body(id))
    /// });
    /// assert_eq!(handler.mode(), InvocationMode::Buffered);
    /// ```
    pub fn buffered_fn<F, Fut>(func: F) -> Self
    where
        F: Fn(HandlerRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult<Response>> + Send + 'static,
    {
        Self::buffered(FnHandler::new(func))
    }

    /// Mode this handler is invoked in.
    #[must_use]
    pub fn mode(&self) -> InvocationMode {
        match self {
            Self::Buffered(_) => InvocationMode::Buffered,
            Self::Streaming(_) => InvocationMode::Streaming,
        }
    }
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Handler").field(&self.mode()).finish()
    }
}

/// Owned snapshot of the request handed to closure handlers.
#[derive(Debug, Clone)]
pub struct HandlerRequest {
    /// Operation name.
    pub operation: String,
    /// HTTP method.
    pub method: Method,
    /// Request URI.
    pub uri: Uri,
    /// Request headers.
    pub headers: HeaderMap,
    /// Path variable bindings.
    pub params: Params,
    /// Request content type.
    pub content_type: Option<MediaType>,
    /// Negotiated response media type.
    pub media_type: MediaType,
    /// Whole request body.
    pub body: Bytes,
}

impl HandlerRequest {
    /// Snapshots `ctx` together with the collected `body`.
    #[must_use]
    pub fn from_context(ctx: &InvocationContext, body: Bytes) -> Self {
        Self {
            operation: ctx.operation().to_string(),
            method: ctx.method().clone(),
            uri: ctx.uri().clone(),
            headers: ctx.headers().clone(),
            params: ctx.params().clone(),
            content_type: ctx.content_type().cloned(),
            media_type: ctx.response().media_type().clone(),
            body,
        }
    }

    /// A single path variable.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    /// Deserializes the body as JSON.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

/// A buffered handler backed by a closure.
pub struct FnHandler<F> {
    func: F,
}

impl<F> FnHandler<F> {
    /// Creates a closure handler.
    #[must_use]
    pub const fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F, Fut> BufferedHandler for FnHandler<F>
where
    F: Fn(HandlerRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult<Response>> + Send + 'static,
{
    fn call<'a>(
        &'a self,
        ctx: &'a mut InvocationContext,
        body: Bytes,
    ) -> BoxFuture<'a, HandlerResult> {
        let fut = (self.func)(HandlerRequest::from_context(ctx, body));
        Box::pin(async move {
            let produced = fut.await?;
            ctx.response_mut().merge(produced);
            Ok(())
        })
    }
}
