//! Recording interceptors and handlers.
//!
//! Each recorder appends to a shared [`EventLog`], so a test can assert the
//! exact order in which interceptors and handlers were called:
//!
//! | Event | Recorded by |
//! |---|---|
//! | `pre:<name>` / `post:<name>:<status>` | [`RecordingInterceptor`] |
//! | `handler` | [`RecordingHandler`] |
//! | `start` / `chunk:<utf8>` / `end` | [`RecordingStreamHandler`] |

use std::sync::Arc;

use anyhow::anyhow;
use bytes::Bytes;
use hermes_core::{
    BoxFuture, BufferedHandler, Handler, HandlerError, HandlerResult, InvocationContext, Response,
    StreamSession, StreamingHandler,
};
use hermes_interceptor::{Flow, Interceptor};
use http::StatusCode;
use parking_lot::Mutex;

/// Shared, ordered log of calls.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<String>>>,
}

impl EventLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event.
    pub fn push(&self, event: impl Into<String>) {
        self.events.lock().push(event.into());
    }

    /// Snapshot of all events in order.
    #[must_use]
    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    /// Number of events equal to `event`.
    #[must_use]
    pub fn count(&self, event: &str) -> usize {
        self.events.lock().iter().filter(|e| *e == event).count()
    }

    /// Returns true if `event` was recorded.
    #[must_use]
    pub fn contains(&self, event: &str) -> bool {
        self.count(event) > 0
    }
}

#[derive(Debug, Clone)]
enum PreBehavior {
    Continue,
    Abort(Response),
    Fail(String),
    Panic(String),
}

/// Interceptor that records both phases and can abort or fail on demand.
#[derive(Debug, Clone)]
pub struct RecordingInterceptor {
    name: String,
    log: EventLog,
    pre: PreBehavior,
    fail_post: Option<String>,
}

impl RecordingInterceptor {
    /// An interceptor that continues and records into `log`.
    pub fn new(name: impl Into<String>, log: &EventLog) -> Self {
        Self {
            name: name.into(),
            log: log.clone(),
            pre: PreBehavior::Continue,
            fail_post: None,
        }
    }

    /// Aborts in the pre-call, leaving `response` in the context.
    #[must_use]
    pub fn aborting(mut self, response: Response) -> Self {
        self.pre = PreBehavior::Abort(response);
        self
    }

    /// Returns an error from the pre-call.
    #[must_use]
    pub fn failing_pre(mut self, message: impl Into<String>) -> Self {
        self.pre = PreBehavior::Fail(message.into());
        self
    }

    /// Panics in the pre-call.
    #[must_use]
    pub fn panicking_pre(mut self, message: impl Into<String>) -> Self {
        self.pre = PreBehavior::Panic(message.into());
        self
    }

    /// Returns an error from the post-call.
    #[must_use]
    pub fn failing_post(mut self, message: impl Into<String>) -> Self {
        self.fail_post = Some(message.into());
        self
    }
}

impl Interceptor for RecordingInterceptor {
    fn name(&self) -> &str {
        &self.name
    }

    fn pre_call<'a>(
        &'a self,
        ctx: &'a mut InvocationContext,
    ) -> BoxFuture<'a, anyhow::Result<Flow>> {
        Box::pin(async move {
            self.log.push(format!("pre:{}", self.name));
            match &self.pre {
                PreBehavior::Continue => Ok(Flow::Continue),
                PreBehavior::Abort(response) => {
                    ctx.response_mut().merge(response.clone());
                    Ok(Flow::Abort)
                }
                PreBehavior::Fail(message) => Err(anyhow!("{message}")),
                PreBehavior::Panic(message) => panic!("{message}"),
            }
        })
    }

    fn post_call<'a>(
        &'a self,
        _ctx: &'a mut InvocationContext,
        status: StatusCode,
    ) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            self.log
                .push(format!("post:{}:{}", self.name, status.as_u16()));
            match &self.fail_post {
                Some(message) => Err(anyhow!("{message}")),
                None => Ok(()),
            }
        })
    }
}

#[derive(Debug, Clone)]
enum Outcome {
    Respond(Response),
    Fail(Response),
    Error(String),
    Panic(String),
}

impl Outcome {
    fn apply(&self, ctx: &mut InvocationContext) -> HandlerResult {
        match self {
            Self::Respond(response) => {
                ctx.response_mut().merge(response.clone());
                Ok(())
            }
            Self::Fail(response) => Err(HandlerError::failure(response.clone())),
            Self::Error(message) => Err(HandlerError::other(anyhow!("{message}"))),
            Self::Panic(message) => panic!("{message}"),
        }
    }
}

/// Buffered handler that records its invocation and returns a fixed outcome.
#[derive(Debug, Clone)]
pub struct RecordingHandler {
    log: EventLog,
    outcome: Outcome,
}

impl RecordingHandler {
    /// Writes `response` into the context.
    pub fn responding(log: &EventLog, response: Response) -> Self {
        Self {
            log: log.clone(),
            outcome: Outcome::Respond(response),
        }
    }

    /// Fails with a business failure carrying `response`.
    pub fn failing(log: &EventLog, response: Response) -> Self {
        Self {
            log: log.clone(),
            outcome: Outcome::Fail(response),
        }
    }

    /// Fails with an unmapped error.
    pub fn erroring(log: &EventLog, message: impl Into<String>) -> Self {
        Self {
            log: log.clone(),
            outcome: Outcome::Error(message.into()),
        }
    }

    /// Panics when called.
    pub fn panicking(log: &EventLog, message: impl Into<String>) -> Self {
        Self {
            log: log.clone(),
            outcome: Outcome::Panic(message.into()),
        }
    }

    /// Wraps into a [`Handler`].
    pub fn into_handler(self) -> Handler {
        Handler::buffered(self)
    }
}

impl BufferedHandler for RecordingHandler {
    fn call<'a>(
        &'a self,
        ctx: &'a mut InvocationContext,
        _body: Bytes,
    ) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            self.log.push("handler");
            self.outcome.apply(ctx)
        })
    }
}

/// Streaming handler that records start, every chunk and end.
///
/// On `end` it answers with the concatenated body and the chunk count in
/// `x-chunk-count`.
#[derive(Debug, Clone)]
pub struct RecordingStreamHandler {
    log: EventLog,
    fail_on_chunk: Option<usize>,
}

impl RecordingStreamHandler {
    /// Records into `log`.
    pub fn new(log: &EventLog) -> Self {
        Self {
            log: log.clone(),
            fail_on_chunk: None,
        }
    }

    /// Fails with a 422 business failure on the `n`th chunk (1-based).
    #[must_use]
    pub fn failing_on_chunk(mut self, n: usize) -> Self {
        self.fail_on_chunk = Some(n);
        self
    }

    /// Wraps into a [`Handler`].
    pub fn into_handler(self) -> Handler {
        Handler::streaming(self)
    }
}

impl StreamingHandler for RecordingStreamHandler {
    fn open<'a>(
        &'a self,
        _ctx: &'a mut InvocationContext,
    ) -> BoxFuture<'a, HandlerResult<Box<dyn StreamSession>>> {
        Box::pin(async move {
            self.log.push("start");
            let session = RecordingSession {
                log: self.log.clone(),
                fail_on_chunk: self.fail_on_chunk,
                received: Vec::new(),
            };
            Ok(Box::new(session) as Box<dyn StreamSession>)
        })
    }
}

struct RecordingSession {
    log: EventLog,
    fail_on_chunk: Option<usize>,
    received: Vec<Bytes>,
}

impl StreamSession for RecordingSession {
    fn chunk<'a>(
        &'a mut self,
        _ctx: &'a mut InvocationContext,
        chunk: Bytes,
    ) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            if self.fail_on_chunk == Some(self.received.len() + 1) {
                self.log.push("chunk-failed");
                return Err(HandlerError::failure(Response::empty(
                    StatusCode::UNPROCESSABLE_ENTITY,
                )));
            }
            self.log
                .push(format!("chunk:{}", String::from_utf8_lossy(&chunk)));
            self.received.push(chunk);
            Ok(())
        })
    }

    fn end<'a>(&'a mut self, ctx: &'a mut InvocationContext) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            self.log.push("end");
            let body: Vec<u8> = self.received.concat();
            let response = ctx.response_mut();
            response.set_body(body);
            response.headers_mut().insert(
                "x-chunk-count",
                http::HeaderValue::from(self.received.len()),
            );
            Ok(())
        })
    }
}
