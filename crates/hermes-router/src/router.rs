//! Candidate-collecting path router.
//!
//! Unlike a first-match router, [`PathRouter`] returns every registered
//! template that structurally matches a path. Several registrations may share
//! a template and differ only in HTTP method or media types; choosing between
//! them is the caller's job.

use crate::template::{normalize_path, RouteTemplate, TemplateError};
use crate::RoutableDestination;

/// A registered template and the value it routes to.
#[derive(Debug, Clone)]
struct Entry<T> {
    template: RouteTemplate,
    value: T,
}

/// Router over path templates, generic in the destination type.
///
/// Entries keep their registration order, and [`PathRouter::route`] reports
/// matches in that order so downstream tie-breaks stay deterministic.
///
/// # Example
///
/// ```rust
/// use hermes_router::PathRouter;
///
/// let mut router = PathRouter::new();
/// router.add("/users/me", "currentUser").unwrap();
/// router.add("/users/{id}", "getUser").unwrap();
///
/// let matches = router.route("/users/me");
/// assert_eq!(matches.len(), 2);
/// assert_eq!(*matches[0].destination, "currentUser");
///
/// let matches = router.route("/users/42");
/// assert_eq!(matches.len(), 1);
/// assert_eq!(matches[0].params.get("id"), Some("42"));
/// ```
#[derive(Debug, Clone)]
pub struct PathRouter<T> {
    entries: Vec<Entry<T>>,
}

impl<T> Default for PathRouter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> PathRouter<T> {
    /// Creates an empty router.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Parses `template` and registers `value` under it.
    pub fn add(&mut self, template: &str, value: T) -> Result<(), TemplateError> {
        let template = RouteTemplate::parse(template)?;
        self.insert(template, value);
        Ok(())
    }

    /// Registers `value` under an already-parsed template.
    pub fn insert(&mut self, template: RouteTemplate, value: T) {
        self.entries.push(Entry { template, value });
    }

    /// Returns every destination whose template matches `path`, in
    /// registration order. An empty result is the "no route" condition.
    #[must_use]
    pub fn route(&self, path: &str) -> Vec<RoutableDestination<'_, T>> {
        let parts: Vec<&str> = normalize_path(path).collect();
        self.entries
            .iter()
            .filter_map(|entry| {
                entry
                    .template
                    .match_segments(&parts)
                    .map(|params| RoutableDestination::new(&entry.value, &entry.template, params))
            })
            .collect()
    }

    /// Iterates over registered `(template, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&RouteTemplate, &T)> {
        self.entries.iter().map(|e| (&e.template, &e.value))
    }

    /// Number of registered entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
