//! Path template router for Hermes.
//!
//! This crate matches request paths against registered route templates and
//! extracts the values of their variable segments.
//!
//! # Features
//!
//! - **Segment templates**: literal segments and named variables (`/users/{id}`)
//! - **Constrained variables**: a variable may carry a regex (`{id:[0-9]+}`)
//! - **All candidates**: every structurally matching template is reported, in
//!   registration order, so a later stage can filter by method and media type
//! - **Round trip**: [`RouteTemplate::expand`] rebuilds a path from bindings
//!
//! # Example
//!
//! ```rust
//! use hermes_router::PathRouter;
//!
//! let mut router = PathRouter::new();
//! router.add("/users", "listUsers").unwrap();
//! router.add("/users/{id}", "getUser").unwrap();
//!
//! let matches = router.route("/users/123");
//! assert_eq!(matches.len(), 1);
//! assert_eq!(*matches[0].destination, "getUser");
//! assert_eq!(matches[0].params.get("id"), Some("123"));
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod params;
mod router;
mod template;

pub use params::Params;
pub use router::PathRouter;
pub use template::{normalize_path, RouteTemplate, Segment, TemplateError};

/// A structural match of a path against one registered template.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutableDestination<'a, T> {
    /// The value registered under the template.
    pub destination: &'a T,
    /// The template that matched.
    pub template: &'a RouteTemplate,
    /// Variable bindings extracted from the path.
    pub params: Params,
}

impl<'a, T> RoutableDestination<'a, T> {
    /// Creates a new destination.
    #[must_use]
    pub fn new(destination: &'a T, template: &'a RouteTemplate, params: Params) -> Self {
        Self {
            destination,
            template,
            params,
        }
    }
}
