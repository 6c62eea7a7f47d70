//! Handler invocation context.
//!
//! One [`InvocationContext`] is created per dispatch. It carries the request
//! metadata, the selected operation, the path bindings and the response being
//! built; interceptors and the handler all work on the same instance.

use http::header::CONTENT_TYPE;
use http::{Extensions, HeaderMap, HeaderValue, Method, Uri, Version};

use crate::context::RequestId;
use crate::handler::InvocationMode;
use crate::media::{parse_accept, MediaType};
use crate::request::Request;
use crate::response::Response;
use hermes_router::Params;

/// Complete per-dispatch state shared by interceptors and the handler.
///
/// # Example
///
/// ```rust
/// use hermes_core::{InvocationContext, InvocationMode};
/// use http::Method;
///
/// let mut ctx = InvocationContext::builder()
///     .method(Method::GET)
///     .uri("/users/42")
///     .operation("getUser")
///     .param("id", "42")
///     .build();
///
/// assert_eq!(ctx.param("id"), Some("42"));
/// assert_eq!(ctx.mode(), InvocationMode::Buffered);
/// ctx.response_mut().set_body("hello");
/// ```
#[derive(Debug)]
pub struct InvocationContext {
    request_id: RequestId,
    operation: String,
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
    content_type: Option<MediaType>,
    accept_types: Vec<MediaType>,
    params: Params,
    response: Response,
    mode: InvocationMode,
    extensions: Extensions,
}

impl InvocationContext {
    /// Creates a context for `request`, bound to `operation`.
    ///
    /// The body is not captured; it is delivered separately according to
    /// `mode`.
    #[must_use]
    pub fn from_request(
        request_id: RequestId,
        request: &Request,
        operation: impl Into<String>,
        params: Params,
        mode: InvocationMode,
    ) -> Self {
        Self {
            request_id,
            operation: operation.into(),
            method: request.method().clone(),
            uri: request.uri().clone(),
            version: request.version(),
            headers: request.headers().clone(),
            content_type: request.content_type(),
            accept_types: request.accept_types(),
            params,
            response: Response::new(),
            mode,
            extensions: Extensions::new(),
        }
    }

    /// Starts a builder, mainly for tests.
    #[must_use]
    pub fn builder() -> InvocationContextBuilder {
        InvocationContextBuilder::new()
    }

    /// Identifier of this dispatch.
    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Operation name of the selected resource method.
    #[must_use]
    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// HTTP method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Request URI.
    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Path portion of the URI.
    #[must_use]
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Query string, if any.
    #[must_use]
    pub fn query_string(&self) -> Option<&str> {
        self.uri.query()
    }

    /// Protocol version.
    #[must_use]
    pub fn version(&self) -> Version {
        self.version
    }

    /// Request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// A request header as a string.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Request content type.
    #[must_use]
    pub fn content_type(&self) -> Option<&MediaType> {
        self.content_type.as_ref()
    }

    /// Caller's acceptable media types, most preferred first.
    #[must_use]
    pub fn accept_types(&self) -> &[MediaType] {
        &self.accept_types
    }

    /// Path variable bindings.
    #[must_use]
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// A single path variable.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    /// Invocation mode of the selected handler.
    #[must_use]
    pub fn mode(&self) -> InvocationMode {
        self.mode
    }

    /// True when the handler receives the body chunk by chunk.
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.mode == InvocationMode::Streaming
    }

    /// The response being built.
    #[must_use]
    pub fn response(&self) -> &Response {
        &self.response
    }

    /// Mutable access to the response being built.
    pub fn response_mut(&mut self) -> &mut Response {
        &mut self.response
    }

    /// Takes the response out, leaving a default one behind.
    pub fn take_response(&mut self) -> Response {
        std::mem::take(&mut self.response)
    }

    /// Request-scoped values shared between interceptors and the handler.
    #[must_use]
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    /// Mutable request-scoped values.
    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }
}

/// Builder for [`InvocationContext`].
#[derive(Debug)]
pub struct InvocationContextBuilder {
    request_id: Option<RequestId>,
    operation: String,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    params: Params,
    mode: InvocationMode,
}

impl Default for InvocationContextBuilder {
    fn default() -> Self {
        Self {
            request_id: None,
            operation: String::new(),
            method: Method::GET,
            uri: Uri::from_static("/"),
            headers: HeaderMap::new(),
            params: Params::new(),
            mode: InvocationMode::Buffered,
        }
    }
}

impl InvocationContextBuilder {
    /// Creates a builder for `GET /`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the request identifier.
    #[must_use]
    pub fn request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
        self
    }

    /// Sets the operation name.
    #[must_use]
    pub fn operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = operation.into();
        self
    }

    /// Sets the method.
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Sets the URI; an unparsable URI leaves the current one.
    #[must_use]
    pub fn uri(mut self, uri: &str) -> Self {
        if let Ok(uri) = uri.parse() {
            self.uri = uri;
        }
        self
    }

    /// Adds a header; invalid values are skipped.
    #[must_use]
    pub fn header(mut self, name: http::HeaderName, value: &str) -> Self {
        if let Ok(value) = HeaderValue::from_str(value) {
            self.headers.append(name, value);
        }
        self
    }

    /// Sets `Content-Type`.
    #[must_use]
    pub fn content_type(self, media_type: &str) -> Self {
        self.header(CONTENT_TYPE, media_type)
    }

    /// Binds a path variable.
    #[must_use]
    pub fn param(mut self, name: &str, value: &str) -> Self {
        self.params.push(name, value);
        self
    }

    /// Sets the invocation mode.
    #[must_use]
    pub fn mode(mut self, mode: InvocationMode) -> Self {
        self.mode = mode;
        self
    }

    /// Builds the context.
    #[must_use]
    pub fn build(self) -> InvocationContext {
        let content_type = self
            .headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| MediaType::parse(v).ok());
        let accept_types = self
            .headers
            .get_all(http::header::ACCEPT)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(parse_accept)
            .collect();

        InvocationContext {
            request_id: self.request_id.unwrap_or_default(),
            operation: self.operation,
            method: self.method,
            uri: self.uri,
            version: Version::HTTP_11,
            headers: self.headers,
            content_type,
            accept_types,
            params: self.params,
            response: Response::new(),
            mode: self.mode,
            extensions: Extensions::new(),
        }
    }
}
