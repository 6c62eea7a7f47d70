//! Route templates.
//!
//! A template is an ordered list of segments. Literal segments must equal the
//! corresponding path segment exactly; variable segments (`{id}`) match any
//! non-empty segment and bind it under the variable's name. A variable may
//! carry a regex constraint (`{id:[0-9]+}`) which must match the whole
//! segment.

use std::fmt;
use std::str::FromStr;

use regex::Regex;
use thiserror::Error;

use crate::params::Params;

/// Errors raised while parsing a route template.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// A segment contains a brace that does not delimit a whole variable.
    #[error("unbalanced braces in segment '{segment}' of template '{template}'")]
    UnbalancedBraces {
        /// The full template.
        template: String,
        /// The offending segment.
        segment: String,
    },

    /// A variable segment has no name (`{}` or `{:re}`).
    #[error("empty variable name in template '{template}'")]
    EmptyVariable {
        /// The full template.
        template: String,
    },

    /// The same variable name appears twice.
    #[error("variable '{name}' declared twice in template '{template}'")]
    DuplicateVariable {
        /// The full template.
        template: String,
        /// The repeated name.
        name: String,
    },

    /// A variable constraint is not a valid regular expression.
    #[error("invalid constraint for variable '{name}': {reason}")]
    InvalidConstraint {
        /// The variable carrying the constraint.
        name: String,
        /// Regex compiler message.
        reason: String,
    },
}

/// One segment of a [`RouteTemplate`].
#[derive(Debug, Clone)]
pub enum Segment {
    /// Must equal the path segment exactly.
    Literal(String),
    /// Matches any non-empty segment, optionally constrained by a regex.
    Variable {
        /// Name the segment value is bound under.
        name: String,
        /// Anchored constraint the whole segment must satisfy.
        constraint: Option<Regex>,
    },
}

impl Segment {
    /// Returns true for literal segments.
    #[must_use]
    pub fn is_literal(&self) -> bool {
        matches!(self, Self::Literal(_))
    }

    fn matches(&self, value: &str) -> bool {
        match self {
            Self::Literal(literal) => literal == value,
            Self::Variable { constraint, .. } => {
                !value.is_empty() && constraint.as_ref().map_or(true, |re| re.is_match(value))
            }
        }
    }
}

impl PartialEq for Segment {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Literal(a), Self::Literal(b)) => a == b,
            (
                Self::Variable {
                    name: a,
                    constraint: ca,
                },
                Self::Variable {
                    name: b,
                    constraint: cb,
                },
            ) => a == b && ca.as_ref().map(Regex::as_str) == cb.as_ref().map(Regex::as_str),
            _ => false,
        }
    }
}

impl Eq for Segment {}

/// A parsed path pattern such as `/users/{id}/posts`.
///
/// Templates are immutable once parsed. Leading, trailing and repeated
/// slashes are insignificant, so `/users/` and `users` parse to the same
/// segments.
///
/// # Example
///
/// ```rust
/// use hermes_router::RouteTemplate;
///
/// let template = RouteTemplate::parse("/orgs/{org}/users/{id:[0-9]+}").unwrap();
/// assert_eq!(template.literal_count(), 2);
///
/// let params = template.match_path("/orgs/acme/users/42").unwrap();
/// assert_eq!(params.get("org"), Some("acme"));
/// assert!(template.match_path("/orgs/acme/users/me").is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTemplate {
    raw: String,
    segments: Vec<Segment>,
}

impl RouteTemplate {
    /// Parses a template string.
    pub fn parse(template: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut names: Vec<&str> = Vec::new();

        for part in split_segments(template) {
            if let Some(inner) = part.strip_prefix('{').and_then(|p| p.strip_suffix('}')) {
                let (name, pattern) = match inner.split_once(':') {
                    Some((name, pattern)) => (name.trim(), Some(pattern)),
                    None => (inner.trim(), None),
                };

                if name.is_empty() {
                    return Err(TemplateError::EmptyVariable {
                        template: template.to_string(),
                    });
                }
                if name.contains(['{', '}']) {
                    return Err(TemplateError::UnbalancedBraces {
                        template: template.to_string(),
                        segment: part.to_string(),
                    });
                }
                if names.contains(&name) {
                    return Err(TemplateError::DuplicateVariable {
                        template: template.to_string(),
                        name: name.to_string(),
                    });
                }
                names.push(name);

                let constraint = pattern
                    .map(|p| {
                        Regex::new(&format!("^(?:{p})$")).map_err(|e| {
                            TemplateError::InvalidConstraint {
                                name: name.to_string(),
                                reason: e.to_string(),
                            }
                        })
                    })
                    .transpose()?;

                segments.push(Segment::Variable {
                    name: name.to_string(),
                    constraint,
                });
            } else if part.contains(['{', '}']) {
                return Err(TemplateError::UnbalancedBraces {
                    template: template.to_string(),
                    segment: part.to_string(),
                });
            } else {
                segments.push(Segment::Literal(part.to_string()));
            }
        }

        Ok(Self {
            raw: template.to_string(),
            segments,
        })
    }

    /// Returns the template as it was written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns the parsed segments.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Number of literal (non-variable) segments.
    #[must_use]
    pub fn literal_count(&self) -> usize {
        self.segments.iter().filter(|s| s.is_literal()).count()
    }

    /// Names of the variables, in template order.
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Variable { name, .. } => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Matches a raw request path, returning the variable bindings.
    #[must_use]
    pub fn match_path(&self, path: &str) -> Option<Params> {
        let parts: Vec<&str> = normalize_path(path).collect();
        self.match_segments(&parts)
    }

    /// Matches already-normalized path segments.
    #[must_use]
    pub fn match_segments(&self, parts: &[&str]) -> Option<Params> {
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = Params::with_capacity(self.segments.len() - self.literal_count());
        for (segment, value) in self.segments.iter().zip(parts) {
            if !segment.matches(value) {
                return None;
            }
            if let Segment::Variable { name, .. } = segment {
                params.push(name.as_str(), *value);
            }
        }
        Some(params)
    }

    /// Builds a concrete path by substituting `params` into the template.
    ///
    /// Returns `None` if a variable is unbound, bound to an empty value, or
    /// bound to a value its constraint rejects.
    #[must_use]
    pub fn expand(&self, params: &Params) -> Option<String> {
        let mut path = String::new();
        for segment in &self.segments {
            path.push('/');
            match segment {
                Segment::Literal(literal) => path.push_str(literal),
                Segment::Variable { name, .. } => {
                    let value = params.get(name)?;
                    if !segment.matches(value) || value.contains('/') {
                        return None;
                    }
                    path.push_str(value);
                }
            }
        }
        if path.is_empty() {
            path.push('/');
        }
        Some(path)
    }
}

impl fmt::Display for RouteTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for RouteTemplate {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Splits a request path into its significant segments.
///
/// The query string and fragment are dropped, as are empty segments produced
/// by leading, trailing or doubled slashes.
pub fn normalize_path(path: &str) -> impl Iterator<Item = &str> {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    split_segments(&path[..end])
}

fn split_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_literals_and_variables() {
        let template = RouteTemplate::parse("/users/{id}/posts").unwrap();
        assert_eq!(template.segments().len(), 3);
        assert_eq!(template.literal_count(), 2);
        assert_eq!(template.variables().collect::<Vec<_>>(), vec!["id"]);
        assert_eq!(template.to_string(), "/users/{id}/posts");
    }

    #[test]
    fn test_parse_root() {
        let template = RouteTemplate::parse("/").unwrap();
        assert!(template.segments().is_empty());
        assert!(template.match_path("/").is_some());
        assert!(template.match_path("").is_some());
        assert!(template.match_path("/x").is_none());
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            RouteTemplate::parse("/users/{}"),
            Err(TemplateError::EmptyVariable { .. })
        ));
        assert!(matches!(
            RouteTemplate::parse("/users/{id"),
            Err(TemplateError::UnbalancedBraces { .. })
        ));
        assert!(matches!(
            RouteTemplate::parse("/files/name.{ext}"),
            Err(TemplateError::UnbalancedBraces { .. })
        ));
        assert!(matches!(
            RouteTemplate::parse("/{id}/{id}"),
            Err(TemplateError::DuplicateVariable { .. })
        ));
        assert!(matches!(
            RouteTemplate::parse("/{id:[0-9}"),
            Err(TemplateError::InvalidConstraint { .. })
        ));
    }

    #[test]
    fn test_match_binds_variables() {
        let template = RouteTemplate::parse("/orgs/{orgId}/users/{userId}").unwrap();
        let params = template.match_path("/orgs/acme/users/123").unwrap();
        assert_eq!(params.get("orgId"), Some("acme"));
        assert_eq!(params.get("userId"), Some("123"));
    }

    #[test]
    fn test_match_requires_same_segment_count() {
        let template = RouteTemplate::parse("/users/{id}").unwrap();
        assert!(template.match_path("/users").is_none());
        assert!(template.match_path("/users/1/extra").is_none());
    }

    #[test]
    fn test_match_ignores_query_and_slashes() {
        let template = RouteTemplate::parse("/users/{id}").unwrap();
        let params = template.match_path("//users/7/?expand=true").unwrap();
        assert_eq!(params.get("id"), Some("7"));
    }

    #[test]
    fn test_constraint_applies_to_whole_segment() {
        let template = RouteTemplate::parse("/items/{id:[0-9]{2}}").unwrap();
        assert!(template.match_path("/items/42").is_some());
        assert!(template.match_path("/items/420").is_none());
        assert!(template.match_path("/items/4a").is_none());
    }

    #[test]
    fn test_expand_round_trip() {
        let template = RouteTemplate::parse("/orgs/{org}/users/{id}").unwrap();
        let params = template.match_path("/orgs/acme/users/42").unwrap();
        assert_eq!(template.expand(&params).as_deref(), Some("/orgs/acme/users/42"));
    }

    #[test]
    fn test_expand_rejects_missing_or_invalid() {
        let template = RouteTemplate::parse("/items/{id:[0-9]+}").unwrap();
        assert!(template.expand(&Params::new()).is_none());

        let bad: Params = [("id", "abc")].into_iter().collect();
        assert!(template.expand(&bad).is_none());

        let empty: Params = [("id", "")].into_iter().collect();
        assert!(template.expand(&empty).is_none());
    }

    #[test]
    fn test_normalize_path() {
        let parts: Vec<_> = normalize_path("/a//b/c/?q=1#frag").collect();
        assert_eq!(parts, vec!["a", "b", "c"]);
    }
}
