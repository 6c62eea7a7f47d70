//! The routing table and resource matcher.
//!
//! [`RoutingTable::select`] narrows the structural matches of the path router
//! down to one resource method:
//!
//! 1. no template matches the path: 404
//! 2. keep candidates with the request's HTTP method, else 405
//! 3. keep candidates that consume the request content type, else 415
//! 4. keep candidates producing something the caller accepts, else 406
//!
//! Survivors are ranked by literal segment count, then consumes specificity,
//! then produces specificity. Ties go to the earliest registration.

use std::sync::Arc;

use hermes_core::{Accept, ContentType, Params, RouteError};
use hermes_router::{PathRouter, RoutableDestination};
use http::Method;
use tracing::debug;

use crate::error::{RegistryError, RegistryResult};
use crate::resource::ResourceMethod;

/// The selected resource method and its path variable bindings.
#[derive(Debug, Clone)]
pub struct Destination {
    /// Selected resource method.
    pub resource: Arc<ResourceMethod>,
    /// Bindings extracted from the path.
    pub params: Params,
}

/// All registered resource methods, in registration order.
///
/// Read-only once built; share it through a
/// [`Registry`](crate::Registry).
#[derive(Debug, Clone, Default)]
pub struct RoutingTable {
    router: PathRouter<Arc<ResourceMethod>>,
}

impl RoutingTable {
    /// An empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a resource method.
    ///
    /// Operation names must be unique.
    pub fn register(&mut self, resource: ResourceMethod) -> RegistryResult<()> {
        if self.get(resource.operation()).is_some() {
            return Err(RegistryError::DuplicateOperation(
                resource.operation().to_string(),
            ));
        }
        debug!(
            operation = resource.operation(),
            method = %resource.method(),
            template = resource.template().as_str(),
            "registered resource method"
        );
        self.router
            .insert(resource.template().clone(), Arc::new(resource));
        Ok(())
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, resource: ResourceMethod) -> RegistryResult<Self> {
        self.register(resource)?;
        Ok(self)
    }

    /// Looks up a resource method by operation name.
    #[must_use]
    pub fn get(&self, operation: &str) -> Option<&Arc<ResourceMethod>> {
        self.iter().find(|r| r.operation() == operation)
    }

    /// Iterates in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<ResourceMethod>> {
        self.router.iter().map(|(_, resource)| resource)
    }

    /// Number of registered resource methods.
    #[must_use]
    pub fn len(&self) -> usize {
        self.router.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.router.is_empty()
    }

    /// Selects the single resource method for a request.
    pub fn select(
        &self,
        method: &Method,
        path: &str,
        content_type: &ContentType,
        accept: &Accept,
    ) -> Result<Destination, RouteError> {
        let candidates = self.router.route(path);
        if candidates.is_empty() {
            return Err(RouteError::NotFound {
                path: path.to_string(),
            });
        }

        let mut allowed: Vec<Method> = Vec::new();
        for candidate in &candidates {
            let m = candidate.destination.method();
            if !allowed.contains(m) {
                allowed.push(m.clone());
            }
        }

        let candidates: Vec<_> = candidates
            .into_iter()
            .filter(|c| c.destination.method() == method)
            .collect();
        if candidates.is_empty() {
            return Err(RouteError::MethodNotAllowed {
                method: method.clone(),
                path: path.to_string(),
                allowed,
            });
        }

        let candidates: Vec<_> = candidates
            .into_iter()
            .filter(|c| c.destination.can_consume(content_type))
            .collect();
        if candidates.is_empty() {
            return Err(RouteError::UnsupportedMediaType {
                content_type: content_type.to_string(),
            });
        }

        let candidates: Vec<_> = candidates
            .into_iter()
            .filter(|c| c.destination.can_produce(accept))
            .collect();

        let selected = best(candidates, content_type, accept).ok_or_else(|| {
            RouteError::NotAcceptable {
                accept: accept.to_string(),
            }
        })?;

        debug!(
            operation = selected.destination.operation(),
            template = selected.template.as_str(),
            "selected resource method"
        );
        Ok(Destination {
            resource: Arc::clone(selected.destination),
            params: selected.params,
        })
    }
}

fn best<'a>(
    candidates: Vec<RoutableDestination<'a, Arc<ResourceMethod>>>,
    content_type: &ContentType,
    accept: &Accept,
) -> Option<RoutableDestination<'a, Arc<ResourceMethod>>> {
    let mut best: Option<((usize, u8, u8), RoutableDestination<'a, Arc<ResourceMethod>>)> = None;
    for candidate in candidates {
        let key = (
            candidate.template.literal_count(),
            candidate.destination.consumes_specificity(content_type),
            candidate.destination.produces_specificity(accept),
        );
        // strictly greater: earlier registrations win ties
        if best.as_ref().map_or(true, |(k, _)| key > *k) {
            best = Some((key, candidate));
        }
    }
    best.map(|(_, candidate)| candidate)
}
