//! The dispatcher.
//!
//! One call to [`Dispatcher::dispatch`] takes a request from the transport to
//! exactly one completion:
//!
//! 1. select the resource method (404 / 405 / 415 / 406 on failure)
//! 2. negotiate the response media type
//! 3. set framing headers on the response
//! 4. run the pre-call interceptors; an abort delivers the response as is
//! 5. invoke the handler, buffered or streaming
//! 6. run the post-call interceptors with the final status
//! 7. deliver the response through the completion callback
//!
//! Every failure, including a panic in a handler or interceptor, becomes a
//! [`DispatchError`] and is mapped to a response at this boundary. The
//! callback is consumed by the delivery, so it fires exactly once.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use arc_swap::ArcSwap;
use futures_util::FutureExt;
use hermes_core::{
    CompletionCallback, DispatchError, ErrorCategory, InvocationContext, Request, RequestId,
    Response,
};
use hermes_interceptor::{BoxedInterceptor, Flow, Interceptor, InterceptorChain, REQUEST_ID_HEADER};
use hermes_telemetry::logging::fields;
use hermes_telemetry::metrics::{record_dispatch, record_interceptor_abort, InFlightGuard};
use http::{HeaderValue, StatusCode};
use tracing::{debug, field, info_span, warn, Instrument, Span};

use crate::error::RegistryResult;
use crate::framing;
use crate::invoker::invoke;
use crate::negotiation::negotiate;
use crate::resource::ResourceMethod;
use crate::table::RoutingTable;

/// Dispatcher behavior switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatcherOptions {
    /// Allow persistent connections. When false every response carries
    /// `Connection: close`.
    pub keep_alive: bool,

    /// Reuse a valid UUID from the inbound `x-request-id` header as the
    /// request ID instead of minting one.
    pub trust_request_id: bool,
}

impl Default for DispatcherOptions {
    fn default() -> Self {
        Self {
            keep_alive: true,
            trust_request_id: false,
        }
    }
}

/// The resource methods and interceptors a dispatcher serves.
///
/// A registry is immutable. To change what is served, build a new one and
/// hand it to [`Dispatcher::replace_registry`].
#[derive(Debug, Clone, Default)]
pub struct Registry {
    table: RoutingTable,
    interceptors: InterceptorChain,
}

impl Registry {
    /// Creates a registry from a table and an interceptor chain.
    #[must_use]
    pub fn new(table: RoutingTable, interceptors: InterceptorChain) -> Self {
        Self {
            table,
            interceptors,
        }
    }

    /// Starts a builder.
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// The routing table.
    #[must_use]
    pub fn table(&self) -> &RoutingTable {
        &self.table
    }

    /// The interceptor chain.
    #[must_use]
    pub fn interceptors(&self) -> &InterceptorChain {
        &self.interceptors
    }
}

/// Builder for [`Registry`].
#[derive(Default)]
pub struct RegistryBuilder {
    resources: Vec<ResourceMethod>,
    interceptors: Vec<BoxedInterceptor>,
}

impl std::fmt::Debug for RegistryBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryBuilder")
            .field("resources", &self.resources)
            .field(
                "interceptors",
                &self.interceptors.iter().map(|i| i.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl RegistryBuilder {
    /// Adds a resource method.
    #[must_use]
    pub fn resource(mut self, resource: ResourceMethod) -> Self {
        self.resources.push(resource);
        self
    }

    /// Appends an interceptor; registration order is execution order.
    #[must_use]
    pub fn interceptor(mut self, interceptor: impl Interceptor) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    /// Registers everything, failing on duplicate operation names.
    pub fn build(self) -> RegistryResult<Registry> {
        let mut table = RoutingTable::new();
        for resource in self.resources {
            table.register(resource)?;
        }
        Ok(Registry::new(table, self.interceptors.into_iter().collect()))
    }
}

/// The request dispatcher.
///
/// Dispatches share nothing mutable; the registry is read through a
/// lock-free snapshot, so a dispatch in flight keeps the registry it started
/// with even if it is replaced meanwhile.
///
/// # Example
///
/// ```
/// use hermes_core::{Handler, Request, Response};
/// use hermes_dispatcher::{Dispatcher, Registry, ResourceMethod};
/// use http::{Method, StatusCode};
///
/// # tokio_test::block_on(async {
/// let registry = Registry::builder()
///     .resource(
///         ResourceMethod::builder(Method::GET, "/hello/{name}")
///             .handler(Handler::buffered_fn(|req| async move {
///                 let name = req.param("name").unwrap_or_default().to_string();
///                 Ok(Response::new().with_body(format!("hello {name}")))
///             }))
///             .build()
///             .unwrap(),
///     )
///     .build()
///     .unwrap();
///
/// let dispatcher = Dispatcher::new(registry);
/// let request = Request::builder().uri("/hello/world").body(()).unwrap();
/// let response = dispatcher.dispatch_response(request).await;
///
/// assert_eq!(response.status(), StatusCode::OK);
/// assert_eq!(response.body().as_ref(), b"hello world");
/// # });
/// ```
#[derive(Debug)]
pub struct Dispatcher {
    registry: ArcSwap<Registry>,
    options: DispatcherOptions,
}

enum Completed {
    Invoked(Response),
    Aborted {
        interceptor: String,
        response: Response,
    },
}

impl Dispatcher {
    /// Creates a dispatcher with default options.
    #[must_use]
    pub fn new(registry: Registry) -> Self {
        Self::with_options(registry, DispatcherOptions::default())
    }

    /// Creates a dispatcher with `options`.
    #[must_use]
    pub fn with_options(registry: Registry, options: DispatcherOptions) -> Self {
        Self {
            registry: ArcSwap::from_pointee(registry),
            options,
        }
    }

    /// The options in effect.
    #[must_use]
    pub fn options(&self) -> DispatcherOptions {
        self.options
    }

    /// A snapshot of the current registry.
    #[must_use]
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.load_full()
    }

    /// Atomically replaces the registry, returning the previous one.
    ///
    /// Dispatches already running finish against the registry they loaded.
    pub fn replace_registry(&self, registry: Registry) -> Arc<Registry> {
        let previous = self.registry.swap(Arc::new(registry));
        debug!(
            resources = self.registry.load().table().len(),
            "registry replaced"
        );
        previous
    }

    /// Dispatches `request` and delivers the response to `callback`.
    pub async fn dispatch(&self, request: Request, callback: CompletionCallback) {
        let response = self.process(request).await;
        callback.done(response);
    }

    /// Dispatches `request` and returns the delivered response.
    pub async fn dispatch_response(&self, request: Request) -> Response {
        let (callback, delivered) = CompletionCallback::channel();
        self.dispatch(request, callback).await;
        delivered
            .await
            .unwrap_or_else(|_| Response::empty(StatusCode::INTERNAL_SERVER_ERROR))
    }

    async fn process(&self, request: Request) -> Response {
        let started = Instant::now();
        let _in_flight = InFlightGuard::new();

        let request_id = self.request_id(&request);
        let connection = framing::connection_value(
            request.version(),
            request.headers(),
            self.options.keep_alive,
        );
        let span = info_span!(
            "dispatch",
            request_id = %request_id,
            http.method = %request.method(),
            http.path = request.path(),
            operation = field::Empty,
        );

        async move {
            let registry = self.registry.load_full();
            let result = AssertUnwindSafe(self.run(&registry, request_id, request, connection.clone()))
                .catch_unwind()
                .await;

            let (outcome, response) = match result {
                Ok(Ok(Completed::Invoked(response))) => ("success", response),
                Ok(Ok(Completed::Aborted {
                    interceptor,
                    response,
                })) => {
                    record_interceptor_abort(&interceptor);
                    ("aborted", response)
                }
                Ok(Err(error)) => {
                    log_failure(&error);
                    let category = error.category();
                    let mut response = error.into_response();
                    if category != ErrorCategory::Business {
                        framing::apply(&mut response, connection);
                    }
                    (category.as_str(), response)
                }
                Err(payload) => {
                    warn!(
                        category = ErrorCategory::Unmapped.as_str(),
                        error = panic_message(&*payload),
                        "dispatch panicked"
                    );
                    let mut response = Response::empty(StatusCode::INTERNAL_SERVER_ERROR);
                    framing::apply(&mut response, connection);
                    (ErrorCategory::Unmapped.as_str(), response)
                }
            };

            let status = response.status().as_u16();
            record_dispatch(outcome, status, started.elapsed());
            debug!(
                outcome,
                http.status_code = status,
                duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                "dispatch complete"
            );
            response
        }
        .instrument(span)
        .await
    }

    async fn run(
        &self,
        registry: &Registry,
        request_id: RequestId,
        request: Request,
        connection: Option<HeaderValue>,
    ) -> Result<Completed, DispatchError> {
        let content_type = request.declared_content_type();
        let accept = request.accept();

        let destination =
            registry
                .table()
                .select(request.method(), request.path(), &content_type, &accept)?;
        let resource = destination.resource;
        Span::current().record(fields::OPERATION, resource.operation());

        let media_type = negotiate(&accept, resource.produces())?;

        let mut ctx = InvocationContext::from_request(
            request_id,
            &request,
            resource.operation(),
            destination.params,
            resource.mode(),
        );
        framing::apply(ctx.response_mut(), connection);
        ctx.response_mut().set_media_type(media_type);

        let mut executor = registry.interceptors().executor();
        if executor.run_pre(&mut ctx).await? == Flow::Abort {
            return Ok(Completed::Aborted {
                interceptor: executor.aborted_by().unwrap_or_default().to_string(),
                response: ctx.take_response(),
            });
        }

        invoke(resource.handler(), &mut ctx, request.into_body()).await?;

        let status = ctx.response().status();
        executor.run_post(&mut ctx, status).await?;

        Ok(Completed::Invoked(ctx.take_response()))
    }

    fn request_id(&self, request: &Request) -> RequestId {
        if self.options.trust_request_id {
            let inbound = request
                .headers()
                .get(REQUEST_ID_HEADER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| RequestId::parse(s).ok());
            if let Some(id) = inbound {
                return id;
            }
        }
        RequestId::new()
    }
}

fn log_failure(error: &DispatchError) {
    match error {
        DispatchError::Routing(e) => {
            debug!(category = "routing", error = %e, "routing failed");
        }
        DispatchError::Business(response) => {
            debug!(
                category = "business",
                http.status_code = response.status().as_u16(),
                "handler returned a business failure"
            );
        }
        DispatchError::Interceptor(failure) => {
            warn!(
                category = "interceptor",
                interceptor = failure.interceptor(),
                phase = %failure.phase(),
                error = %format!("{:#}", failure.cause()),
                "interceptor failed"
            );
        }
        DispatchError::Unmapped(e) => {
            warn!(category = "unmapped", error = %format!("{e:#}"), "unmapped failure");
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
