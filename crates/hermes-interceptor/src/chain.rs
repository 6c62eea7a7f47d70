//! Ordered interceptor chain and its per-dispatch executor.
//!
//! An [`InterceptorChain`] is the immutable, ordered registration list shared
//! by every dispatch. Each dispatch drives its own [`InterceptorExecutor`]
//! through the state machine
//!
//! ```text
//! Pending --run_pre--> PreRun --run_post--> Invoked
//!    |                    |
//!    +--(abort)--> Aborted
//!    +--(error)--> Failed <--(error)--+
//! ```
//!
//! Calling a phase from the wrong state is rejected with
//! [`ChainError::OutOfOrder`] instead of silently running interceptors twice.

use std::fmt;
use std::sync::Arc;

use hermes_core::{DispatchError, InterceptorFailure, InterceptorPhase, InvocationContext};
use http::StatusCode;
use thiserror::Error;
use tracing::debug;

use crate::interceptor::{Flow, Interceptor};

/// A shared interceptor.
pub type BoxedInterceptor = Arc<dyn Interceptor>;

/// Immutable ordered list of interceptors.
///
/// Cloning is cheap; clones share the same list.
#[derive(Clone, Default)]
pub struct InterceptorChain {
    interceptors: Arc<[BoxedInterceptor]>,
}

impl InterceptorChain {
    /// An empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts building a chain.
    #[must_use]
    pub fn builder() -> InterceptorChainBuilder {
        InterceptorChainBuilder::default()
    }

    /// Number of interceptors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    /// Returns true if the chain has no interceptors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    /// Interceptor names in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.interceptors.iter().map(|i| i.name()).collect()
    }

    /// Iterates in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &BoxedInterceptor> {
        self.interceptors.iter()
    }

    /// A fresh executor over this chain.
    #[must_use]
    pub fn executor(&self) -> InterceptorExecutor {
        InterceptorExecutor::new(self.clone())
    }
}

impl fmt::Debug for InterceptorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptorChain")
            .field("interceptors", &self.names())
            .finish()
    }
}

impl FromIterator<BoxedInterceptor> for InterceptorChain {
    fn from_iter<I: IntoIterator<Item = BoxedInterceptor>>(iter: I) -> Self {
        Self {
            interceptors: iter.into_iter().collect(),
        }
    }
}

/// Builder for [`InterceptorChain`].
#[derive(Default)]
pub struct InterceptorChainBuilder {
    interceptors: Vec<BoxedInterceptor>,
}

impl InterceptorChainBuilder {
    /// Appends an interceptor; registration order is execution order.
    #[must_use]
    pub fn with(mut self, interceptor: impl Interceptor) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    /// Appends an already shared interceptor.
    #[must_use]
    pub fn with_shared(mut self, interceptor: BoxedInterceptor) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    /// Freezes the chain.
    #[must_use]
    pub fn build(self) -> InterceptorChain {
        self.interceptors.into_iter().collect()
    }
}

/// States of an [`InterceptorExecutor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainState {
    /// Nothing has run yet.
    Pending,
    /// Every pre-call continued; the handler may run.
    PreRun,
    /// Post-calls have run.
    Invoked,
    /// A pre-call aborted.
    Aborted,
    /// An interceptor failed.
    Failed,
}

impl fmt::Display for ChainState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::PreRun => "pre-run",
            Self::Invoked => "invoked",
            Self::Aborted => "aborted",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Errors raised while driving the chain.
#[derive(Debug, Error)]
pub enum ChainError {
    /// A phase was called from the wrong state.
    #[error("interceptor chain is {actual}, expected {expected}")]
    OutOfOrder {
        /// State the phase requires.
        expected: ChainState,
        /// State the executor was in.
        actual: ChainState,
    },

    /// An interceptor returned an error.
    #[error(transparent)]
    Interceptor(#[from] InterceptorFailure),
}

impl From<ChainError> for DispatchError {
    fn from(error: ChainError) -> Self {
        match error {
            ChainError::Interceptor(failure) => Self::Interceptor(failure),
            out_of_order @ ChainError::OutOfOrder { .. } => Self::unmapped(out_of_order),
        }
    }
}

/// Drives one dispatch through the chain.
#[derive(Debug)]
pub struct InterceptorExecutor {
    chain: InterceptorChain,
    state: ChainState,
    aborted_by: Option<String>,
}

impl InterceptorExecutor {
    /// Creates an executor in the `Pending` state.
    #[must_use]
    pub fn new(chain: InterceptorChain) -> Self {
        Self {
            chain,
            state: ChainState::Pending,
            aborted_by: None,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> ChainState {
        self.state
    }

    /// Name of the interceptor that aborted, if any.
    #[must_use]
    pub fn aborted_by(&self) -> Option<&str> {
        self.aborted_by.as_deref()
    }

    /// Runs every pre-call in order until one aborts or fails.
    ///
    /// Returns [`Flow::Continue`] when the handler should run.
    pub async fn run_pre(&mut self, ctx: &mut InvocationContext) -> Result<Flow, ChainError> {
        self.expect(ChainState::Pending)?;

        for interceptor in self.chain.interceptors.iter() {
            match interceptor.pre_call(ctx).await {
                Ok(Flow::Continue) => {}
                Ok(Flow::Abort) => {
                    debug!(interceptor = interceptor.name(), "pre-call aborted dispatch");
                    self.state = ChainState::Aborted;
                    self.aborted_by = Some(interceptor.name().to_string());
                    return Ok(Flow::Abort);
                }
                Err(source) => {
                    self.state = ChainState::Failed;
                    return Err(InterceptorFailure::new(
                        interceptor.name(),
                        InterceptorPhase::PreCall,
                        source,
                    )
                    .into());
                }
            }
        }

        self.state = ChainState::PreRun;
        Ok(Flow::Continue)
    }

    /// Runs every post-call in order with the final `status`.
    pub async fn run_post(
        &mut self,
        ctx: &mut InvocationContext,
        status: StatusCode,
    ) -> Result<(), ChainError> {
        self.expect(ChainState::PreRun)?;

        for interceptor in self.chain.interceptors.iter() {
            if let Err(source) = interceptor.post_call(ctx, status).await {
                self.state = ChainState::Failed;
                return Err(InterceptorFailure::new(
                    interceptor.name(),
                    InterceptorPhase::PostCall,
                    source,
                )
                .into());
            }
        }

        self.state = ChainState::Invoked;
        Ok(())
    }

    fn expect(&self, expected: ChainState) -> Result<(), ChainError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(ChainError::OutOfOrder {
                expected,
                actual: self.state,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hermes_core::{BoxFuture, ErrorCategory, Response};
    use parking_lot::Mutex;

    type Log = Arc<Mutex<Vec<String>>>;

    #[derive(Clone, Copy)]
    enum Behavior {
        Continue,
        Abort,
        FailPre,
        FailPost,
    }

    struct Scripted {
        name: &'static str,
        behavior: Behavior,
        log: Log,
    }

    impl Interceptor for Scripted {
        fn name(&self) -> &str {
            self.name
        }

        fn pre_call<'a>(
            &'a self,
            ctx: &'a mut InvocationContext,
        ) -> BoxFuture<'a, anyhow::Result<Flow>> {
            Box::pin(async move {
                self.log.lock().push(format!("pre:{}", self.name));
                match self.behavior {
                    Behavior::Abort => {
                        ctx.response_mut()
                            .merge(Response::empty(StatusCode::UNAUTHORIZED));
                        Ok(Flow::Abort)
                    }
                    Behavior::FailPre => Err(anyhow::anyhow!("pre failed")),
                    Behavior::Continue | Behavior::FailPost => Ok(Flow::Continue),
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
                    .lock()
                    .push(format!("post:{}:{}", self.name, status.as_u16()));
                match self.behavior {
                    Behavior::FailPost => Err(anyhow::anyhow!("post failed")),
                    _ => Ok(()),
                }
            })
        }
    }

    fn chain(log: &Log, behaviors: &[(&'static str, Behavior)]) -> InterceptorChain {
        behaviors
            .iter()
            .map(|&(name, behavior)| {
                Arc::new(Scripted {
                    name,
                    behavior,
                    log: Arc::clone(log),
                }) as BoxedInterceptor
            })
            .collect()
    }

    fn entries(log: &Log) -> Vec<String> {
        log.lock().clone()
    }

    #[tokio::test]
    async fn test_all_continue_runs_both_phases_in_order() {
        let log = Log::default();
        let chain = chain(&log, &[("a", Behavior::Continue), ("b", Behavior::Continue)]);
        let mut ctx = InvocationContext::builder().build();
        let mut exec = chain.executor();

        assert_eq!(exec.run_pre(&mut ctx).await.unwrap(), Flow::Continue);
        assert_eq!(exec.state(), ChainState::PreRun);
        exec.run_post(&mut ctx, StatusCode::CREATED).await.unwrap();
        assert_eq!(exec.state(), ChainState::Invoked);

        assert_eq!(
            entries(&log),
            vec!["pre:a", "pre:b", "post:a:201", "post:b:201"]
        );
    }

    #[tokio::test]
    async fn test_abort_skips_remaining_pre_calls() {
        let log = Log::default();
        let chain = chain(
            &log,
            &[
                ("a", Behavior::Continue),
                ("gate", Behavior::Abort),
                ("c", Behavior::Continue),
            ],
        );
        let mut ctx = InvocationContext::builder().build();
        let mut exec = chain.executor();

        assert_eq!(exec.run_pre(&mut ctx).await.unwrap(), Flow::Abort);
        assert_eq!(exec.state(), ChainState::Aborted);
        assert_eq!(exec.aborted_by(), Some("gate"));
        assert_eq!(ctx.response().status(), StatusCode::UNAUTHORIZED);
        assert_eq!(entries(&log), vec!["pre:a", "pre:gate"]);

        let err = exec.run_post(&mut ctx, StatusCode::OK).await.unwrap_err();
        assert!(matches!(
            err,
            ChainError::OutOfOrder {
                expected: ChainState::PreRun,
                actual: ChainState::Aborted
            }
        ));
        assert_eq!(entries(&log).len(), 2);
    }

    #[tokio::test]
    async fn test_pre_call_failure() {
        let log = Log::default();
        let chain = chain(&log, &[("bad", Behavior::FailPre), ("b", Behavior::Continue)]);
        let mut ctx = InvocationContext::builder().build();
        let mut exec = chain.executor();

        let err = exec.run_pre(&mut ctx).await.unwrap_err();
        assert_eq!(exec.state(), ChainState::Failed);
        let ChainError::Interceptor(failure) = &err else {
            panic!("expected interceptor failure, got {err:?}");
        };
        assert_eq!(failure.interceptor(), "bad");
        assert_eq!(failure.phase(), InterceptorPhase::PreCall);
        assert_eq!(entries(&log), vec!["pre:bad"]);

        let dispatch = DispatchError::from(err);
        assert_eq!(dispatch.category(), ErrorCategory::Interceptor);
    }

    #[tokio::test]
    async fn test_post_call_failure_stops_phase() {
        let log = Log::default();
        let chain = chain(
            &log,
            &[("a", Behavior::FailPost), ("b", Behavior::Continue)],
        );
        let mut ctx = InvocationContext::builder().build();
        let mut exec = chain.executor();

        exec.run_pre(&mut ctx).await.unwrap();
        let err = exec.run_post(&mut ctx, StatusCode::OK).await.unwrap_err();
        assert!(matches!(
            &err,
            ChainError::Interceptor(f) if f.phase() == InterceptorPhase::PostCall
        ));
        assert_eq!(entries(&log), vec!["pre:a", "pre:b", "post:a:200"]);
    }

    #[tokio::test]
    async fn test_pre_cannot_run_twice() {
        let chain = InterceptorChain::new();
        let mut ctx = InvocationContext::builder().build();
        let mut exec = chain.executor();

        exec.run_pre(&mut ctx).await.unwrap();
        let err = exec.run_pre(&mut ctx).await.unwrap_err();
        assert!(matches!(err, ChainError::OutOfOrder { .. }));
        assert_eq!(
            DispatchError::from(err).category(),
            ErrorCategory::Unmapped
        );
    }

    #[test]
    fn test_builder_keeps_order() {
        let log = Log::default();
        let chain = InterceptorChain::builder()
            .with(Scripted {
                name: "first",
                behavior: Behavior::Continue,
                log: Arc::clone(&log),
            })
            .with(Scripted {
                name: "second",
                behavior: Behavior::Continue,
                log,
            })
            .build();
        assert_eq!(chain.names(), vec!["first", "second"]);
        assert_eq!(chain.len(), 2);
        assert!(format!("{chain:?}").contains("first"));
    }
}
