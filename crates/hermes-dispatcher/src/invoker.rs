//! Method invocation engine.
//!
//! [`invoke`] runs the selected handler in the mode it was registered with.
//! Buffered handlers get the collected body in one call. Streaming handlers
//! are driven through a [`StreamingInvocation`]:
//!
//! ```text
//! NotStarted --start--> Streaming --chunk*--> Streaming --end--> Ended
//!                           |
//!                           +--(failure)--> Ended
//! ```
//!
//! Chunks are delivered one at a time in transport order; the next chunk is
//! not pulled from the body until the handler finished the previous one.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use futures_util::StreamExt;
use hermes_core::{
    Body, DispatchError, Handler, HandlerError, InvocationContext, StreamSession, StreamingHandler,
};
use thiserror::Error;
use tracing::trace;

/// States of a [`StreamingInvocation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// The start signal has not been sent.
    NotStarted,
    /// Chunks are being delivered.
    Streaming,
    /// `end` was delivered, or the invocation failed.
    Ended,
}

impl fmt::Display for StreamState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NotStarted => "not started",
            Self::Streaming => "streaming",
            Self::Ended => "ended",
        })
    }
}

/// Errors raised by the invocation engine.
#[derive(Debug, Error)]
pub enum InvokeError {
    /// The handler failed, or the body could not be read.
    #[error(transparent)]
    Handler(#[from] HandlerError),

    /// A streaming signal was sent in the wrong state.
    #[error("cannot {op} a streaming invocation that is {state}")]
    OutOfOrder {
        /// The rejected signal.
        op: &'static str,
        /// State the invocation was in.
        state: StreamState,
    },
}

impl From<InvokeError> for DispatchError {
    fn from(error: InvokeError) -> Self {
        match error {
            InvokeError::Handler(e) => e.into(),
            out_of_order @ InvokeError::OutOfOrder { .. } => Self::unmapped(out_of_order),
        }
    }
}

/// Drives one streaming handler through a single request.
pub struct StreamingInvocation {
    handler: Arc<dyn StreamingHandler>,
    session: Option<Box<dyn StreamSession>>,
    state: StreamState,
    chunks: usize,
}

impl StreamingInvocation {
    /// Creates an invocation in the `NotStarted` state.
    #[must_use]
    pub fn new(handler: Arc<dyn StreamingHandler>) -> Self {
        Self {
            handler,
            session: None,
            state: StreamState::NotStarted,
            chunks: 0,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Number of chunks delivered so far.
    #[must_use]
    pub fn chunks_delivered(&self) -> usize {
        self.chunks
    }

    /// Sends the start signal and opens the handler's session.
    pub async fn start(&mut self, ctx: &mut InvocationContext) -> Result<(), InvokeError> {
        self.expect(StreamState::NotStarted, "start")?;
        match self.handler.open(ctx).await {
            Ok(session) => {
                self.session = Some(session);
                self.state = StreamState::Streaming;
                Ok(())
            }
            Err(e) => {
                self.state = StreamState::Ended;
                Err(e.into())
            }
        }
    }

    /// Delivers the next chunk.
    pub async fn chunk(
        &mut self,
        ctx: &mut InvocationContext,
        chunk: Bytes,
    ) -> Result<(), InvokeError> {
        let session = self.session_for("deliver a chunk to")?;
        let len = chunk.len();
        let result = session.chunk(ctx, chunk).await;
        match result {
            Ok(()) => {
                self.chunks += 1;
                trace!(chunk = self.chunks, len, "delivered chunk");
                Ok(())
            }
            Err(e) => {
                self.fail();
                Err(e.into())
            }
        }
    }

    /// Sends the end signal. The session is released afterwards.
    pub async fn end(&mut self, ctx: &mut InvocationContext) -> Result<(), InvokeError> {
        let session = self.session_for("end")?;
        let result = session.end(ctx).await;
        self.fail();
        result.map_err(Into::into)
    }

    /// Ends the invocation without sending the end signal, e.g. after a
    /// transport error.
    pub fn fail(&mut self) {
        self.session = None;
        self.state = StreamState::Ended;
    }

    fn expect(&self, state: StreamState, op: &'static str) -> Result<(), InvokeError> {
        if self.state == state {
            Ok(())
        } else {
            Err(InvokeError::OutOfOrder {
                op,
                state: self.state,
            })
        }
    }

    fn session_for(&mut self, op: &'static str) -> Result<&mut Box<dyn StreamSession>, InvokeError> {
        let state = self.state;
        match (state, self.session.as_mut()) {
            (StreamState::Streaming, Some(session)) => Ok(session),
            _ => Err(InvokeError::OutOfOrder { op, state }),
        }
    }
}

impl fmt::Debug for StreamingInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamingInvocation")
            .field("state", &self.state)
            .field("chunks", &self.chunks)
            .finish_non_exhaustive()
    }
}

/// Invokes `handler` with `body`.
///
/// A transport error while reading the body fails the invocation; for
/// streaming handlers `end` is then never called.
pub async fn invoke(
    handler: &Handler,
    ctx: &mut InvocationContext,
    body: Body,
) -> Result<(), InvokeError> {
    match handler {
        Handler::Buffered(handler) => {
            let bytes = body.collect().await.map_err(HandlerError::from)?;
            handler.call(ctx, bytes).await?;
            Ok(())
        }
        Handler::Streaming(handler) => {
            let mut invocation = StreamingInvocation::new(Arc::clone(handler));
            invocation.start(ctx).await?;

            let mut chunks = body.into_stream();
            while let Some(chunk) = chunks.next().await {
                match chunk {
                    Ok(bytes) => invocation.chunk(ctx, bytes).await?,
                    Err(e) => {
                        invocation.fail();
                        return Err(HandlerError::from(e).into());
                    }
                }
            }

            invocation.end(ctx).await
        }
    }
}
