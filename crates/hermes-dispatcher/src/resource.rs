//! Resource method descriptors.
//!
//! A [`ResourceMethod`] is the unit a request can be dispatched to: an HTTP
//! method, a route template, the media types it consumes and produces, and
//! the handler that serves it. Descriptors are immutable once built.

use std::fmt;

use hermes_core::media::parse_list;
use hermes_core::{Accept, ContentType, Handler, InvocationMode, MediaType};
use hermes_router::RouteTemplate;
use http::Method;

use crate::error::{RegistryError, RegistryResult};

/// A registered resource method.
///
/// # Example
///
/// ```
/// use hermes_core::{Handler, Response};
/// use hermes_dispatcher::ResourceMethod;
/// use http::Method;
///
/// let resource = ResourceMethod::builder(Method::GET, "/users/{id}")
///     .operation("getUser")
///     .produces("application/json")
///     .handler(Handler::buffered_fn(|_req| async { Ok(Response::new()) }))
///     .build()
///     .unwrap();
///
/// assert_eq!(resource.operation(), "getUser");
/// assert_eq!(resource.template().literal_count(), 1);
/// assert!(resource.consumes()[0].is_wildcard());
/// ```
#[derive(Clone)]
pub struct ResourceMethod {
    operation: String,
    method: Method,
    template: RouteTemplate,
    consumes: Vec<MediaType>,
    produces: Vec<MediaType>,
    handler: Handler,
}

impl ResourceMethod {
    /// Starts a builder for `method` on `template`.
    #[must_use]
    pub fn builder(method: Method, template: impl Into<String>) -> ResourceMethodBuilder {
        ResourceMethodBuilder::new(method, template)
    }

    /// Operation name, used in logs and the invocation context.
    #[must_use]
    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// HTTP method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Route template.
    #[must_use]
    pub fn template(&self) -> &RouteTemplate {
        &self.template
    }

    /// Consumable media types; `[*/*]` when none were declared.
    #[must_use]
    pub fn consumes(&self) -> &[MediaType] {
        &self.consumes
    }

    /// Produced media types in producer preference order; `[*/*]` when none
    /// were declared.
    #[must_use]
    pub fn produces(&self) -> &[MediaType] {
        &self.produces
    }

    /// The handler.
    #[must_use]
    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    /// Invocation mode of the handler.
    #[must_use]
    pub fn mode(&self) -> InvocationMode {
        self.handler.mode()
    }

    /// Whether a request declaring `content_type` may be consumed. A request
    /// without a content type is accepted by every resource method, one whose
    /// content type does not parse only by a method consuming `*/*`.
    #[must_use]
    pub fn can_consume(&self, content_type: &ContentType) -> bool {
        match content_type {
            ContentType::Absent => true,
            ContentType::Valid(ct) => self.consumes.iter().any(|c| c.is_compatible(ct)),
            ContentType::Invalid(_) => self.consumes.iter().any(MediaType::is_wildcard),
        }
    }

    /// Whether any produced type is acceptable to the caller.
    #[must_use]
    pub fn can_produce(&self, accept: &Accept) -> bool {
        self.produces.iter().any(|p| accept.allows(p))
    }

    /// Specificity of the most specific consumes entry matching
    /// `content_type`; 0 without a valid content type.
    pub(crate) fn consumes_specificity(&self, content_type: &ContentType) -> u8 {
        content_type.media_type().map_or(0, |ct| {
            self.consumes
                .iter()
                .filter(|c| c.is_compatible(ct))
                .map(MediaType::specificity)
                .max()
                .unwrap_or(0)
        })
    }

    /// Specificity of the most specific produces entry acceptable to the
    /// caller.
    pub(crate) fn produces_specificity(&self, accept: &Accept) -> u8 {
        self.produces
            .iter()
            .filter(|p| accept.allows(p))
            .map(MediaType::specificity)
            .max()
            .unwrap_or(0)
    }
}

impl fmt::Debug for ResourceMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceMethod")
            .field("operation", &self.operation)
            .field("method", &self.method)
            .field("template", &self.template.as_str())
            .field("consumes", &self.consumes)
            .field("produces", &self.produces)
            .field("mode", &self.mode())
            .finish()
    }
}

/// Builder for [`ResourceMethod`].
///
/// Media types are validated in [`build`](Self::build), so the builder chain
/// stays infallible.
#[derive(Debug)]
pub struct ResourceMethodBuilder {
    method: Method,
    template: String,
    operation: Option<String>,
    consumes: Vec<String>,
    produces: Vec<String>,
    handler: Option<Handler>,
}

impl ResourceMethodBuilder {
    fn new(method: Method, template: impl Into<String>) -> Self {
        Self {
            method,
            template: template.into(),
            operation: None,
            consumes: Vec::new(),
            produces: Vec::new(),
            handler: None,
        }
    }

    /// Sets the operation name. Defaults to `"METHOD template"`.
    #[must_use]
    pub fn operation(mut self, name: impl Into<String>) -> Self {
        self.operation = Some(name.into());
        self
    }

    /// Adds a consumable media type.
    #[must_use]
    pub fn consumes(mut self, media_type: impl Into<String>) -> Self {
        self.consumes.push(media_type.into());
        self
    }

    /// Adds a produced media type; order is producer preference.
    #[must_use]
    pub fn produces(mut self, media_type: impl Into<String>) -> Self {
        self.produces.push(media_type.into());
        self
    }

    /// Sets the handler.
    #[must_use]
    pub fn handler(mut self, handler: Handler) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Validates and freezes the descriptor.
    pub fn build(self) -> RegistryResult<ResourceMethod> {
        let operation = self
            .operation
            .unwrap_or_else(|| format!("{} {}", self.method, self.template));

        let template =
            RouteTemplate::parse(&self.template).map_err(|source| RegistryError::Template {
                operation: operation.clone(),
                source,
            })?;

        let media_list = |items: Vec<String>| -> RegistryResult<Vec<MediaType>> {
            if items.is_empty() {
                return Ok(vec![MediaType::wildcard()]);
            }
            parse_list(items).map_err(|source| RegistryError::MediaType {
                operation: operation.clone(),
                source,
            })
        };
        let consumes = media_list(self.consumes)?;
        let produces = media_list(self.produces)?;

        let handler = self
            .handler
            .ok_or_else(|| RegistryError::MissingHandler(operation.clone()))?;

        Ok(ResourceMethod {
            operation,
            method: self.method,
            template,
            consumes,
            produces,
            handler,
        })
    }
}
