//! Media types.
//!
//! [`MediaType`] is a parsed `type/subtype; param=value` string. Matching is
//! case-insensitive on type and subtype and ignores parameters, so
//! `application/json; charset=utf-8` is compatible with `application/json`.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Error returned for strings that are not `type/subtype`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid media type '{0}'")]
pub struct MediaTypeError(pub String);

/// A parsed media type.
///
/// # Example
///
/// ```
/// use hermes_core::MediaType;
///
/// let json: MediaType = "Application/JSON; charset=utf-8".parse().unwrap();
/// assert_eq!(json.essence(), "application/json");
/// assert_eq!(json.param("charset"), Some("utf-8"));
///
/// let any_text: MediaType = "text/*".parse().unwrap();
/// assert!(any_text.is_compatible(&"text/plain".parse().unwrap()));
/// assert!(!any_text.is_compatible(&json));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaType {
    type_: String,
    subtype: String,
    params: Vec<(String, String)>,
}

impl MediaType {
    /// The full wildcard, `*/*`.
    pub const WILDCARD: &'static str = "*/*";

    /// Creates a media type without parameters.
    #[must_use]
    pub fn new(type_: impl Into<String>, subtype: impl Into<String>) -> Self {
        Self {
            type_: type_.into().to_ascii_lowercase(),
            subtype: subtype.into().to_ascii_lowercase(),
            params: Vec::new(),
        }
    }

    /// `*/*`.
    #[must_use]
    pub fn wildcard() -> Self {
        Self::new("*", "*")
    }

    /// `application/json`.
    #[must_use]
    pub fn json() -> Self {
        Self::new("application", "json")
    }

    /// `text/plain`.
    #[must_use]
    pub fn text_plain() -> Self {
        Self::new("text", "plain")
    }

    /// `application/octet-stream`.
    #[must_use]
    pub fn octet_stream() -> Self {
        Self::new("application", "octet-stream")
    }

    /// Parses a media type string.
    pub fn parse(s: &str) -> Result<Self, MediaTypeError> {
        let mut parts = s.split(';');
        let essence = parts.next().unwrap_or_default().trim();

        // Some clients send a bare `*` for "anything".
        let (type_, subtype) = if essence == "*" {
            ("*", "*")
        } else {
            essence
                .split_once('/')
                .map(|(t, st)| (t.trim(), st.trim()))
                .ok_or_else(|| MediaTypeError(s.to_string()))?
        };

        if !is_token(type_) || !is_token(subtype) || (type_ == "*" && subtype != "*") {
            return Err(MediaTypeError(s.to_string()));
        }

        let params = parts
            .filter_map(|p| {
                let (k, v) = p.split_once('=')?;
                let k = k.trim();
                if k.is_empty() {
                    return None;
                }
                Some((k.to_ascii_lowercase(), v.trim().trim_matches('"').to_string()))
            })
            .collect();

        Ok(Self {
            type_: type_.to_ascii_lowercase(),
            subtype: subtype.to_ascii_lowercase(),
            params,
        })
    }

    /// Top-level type (`application` in `application/json`).
    #[must_use]
    pub fn type_(&self) -> &str {
        &self.type_
    }

    /// Subtype (`json` in `application/json`).
    #[must_use]
    pub fn subtype(&self) -> &str {
        &self.subtype
    }

    /// `type/subtype` without parameters.
    #[must_use]
    pub fn essence(&self) -> String {
        format!("{}/{}", self.type_, self.subtype)
    }

    /// Value of a parameter, if present.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// True for `*/*`.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.type_ == "*" && self.subtype == "*"
    }

    /// True for `*/*` and `type/*`.
    #[must_use]
    pub fn is_wildcard_subtype(&self) -> bool {
        self.subtype == "*"
    }

    /// 0 for `*/*`, 1 for `type/*`, 2 for a concrete type.
    #[must_use]
    pub fn specificity(&self) -> u8 {
        if self.is_wildcard() {
            0
        } else if self.is_wildcard_subtype() {
            1
        } else {
            2
        }
    }

    /// True if type and subtype are equal, ignoring parameters.
    #[must_use]
    pub fn same_essence(&self, other: &Self) -> bool {
        self.type_ == other.type_ && self.subtype == other.subtype
    }

    /// Symmetric compatibility: wildcards on either side match.
    #[must_use]
    pub fn is_compatible(&self, other: &Self) -> bool {
        if self.is_wildcard() || other.is_wildcard() {
            return true;
        }
        if self.type_ != other.type_ {
            return false;
        }
        self.is_wildcard_subtype() || other.is_wildcard_subtype() || self.subtype == other.subtype
    }
}

impl Default for MediaType {
    fn default() -> Self {
        Self::wildcard()
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.type_, self.subtype)?;
        for (k, v) in &self.params {
            write!(f, "; {k}={v}")?;
        }
        Ok(())
    }
}

impl FromStr for MediaType {
    type Err = MediaTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Splits an `Accept` header into media types, keeping the caller's order.
///
/// Empty and malformed entries are skipped. Quality parameters are kept as
/// parameters and do not reorder the list.
#[must_use]
pub fn parse_accept(header: &str) -> Vec<MediaType> {
    header
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| MediaType::parse(s).ok())
        .collect()
}

/// The `Content-Type` a request declares.
///
/// A header that does not parse is kept apart from a missing one: only a
/// resource consuming `*/*` accepts it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ContentType {
    /// No `Content-Type` header.
    #[default]
    Absent,
    /// A valid media type.
    Valid(MediaType),
    /// A header value that is not a media type.
    Invalid(String),
}

impl ContentType {
    /// Classifies a raw header value.
    #[must_use]
    pub fn from_header(value: Option<&str>) -> Self {
        match value {
            None => Self::Absent,
            Some(raw) => MediaType::parse(raw)
                .map_or_else(|_| Self::Invalid(raw.to_string()), Self::Valid),
        }
    }

    /// The media type, when the header was present and valid.
    #[must_use]
    pub fn media_type(&self) -> Option<&MediaType> {
        match self {
            Self::Valid(media_type) => Some(media_type),
            Self::Absent | Self::Invalid(_) => None,
        }
    }
}

impl From<MediaType> for ContentType {
    fn from(media_type: MediaType) -> Self {
        Self::Valid(media_type)
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => Ok(()),
            Self::Valid(media_type) => write!(f, "{media_type}"),
            Self::Invalid(raw) => f.write_str(raw),
        }
    }
}

/// The media types a caller accepts.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Accept {
    /// No `Accept` header; every media type is acceptable.
    #[default]
    Any,
    /// The valid entries of a declared `Accept` header, in caller order.
    /// Empty when no entry parsed, which nothing satisfies.
    Listed(Vec<MediaType>),
}

impl Accept {
    /// Parses one or more `Accept` header values, concatenated in order.
    /// No values at all yields [`Accept::Any`].
    pub fn from_headers<'a, I>(values: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut values = values.into_iter().peekable();
        if values.peek().is_none() {
            return Self::Any;
        }
        Self::Listed(values.flat_map(parse_accept).collect())
    }

    /// The listed types; empty for [`Accept::Any`].
    #[must_use]
    pub fn types(&self) -> &[MediaType] {
        match self {
            Self::Any => &[],
            Self::Listed(types) => types,
        }
    }

    /// True if `media_type` satisfies the caller.
    #[must_use]
    pub fn allows(&self, media_type: &MediaType) -> bool {
        match self {
            Self::Any => true,
            Self::Listed(types) => types.iter().any(|a| media_type.is_compatible(a)),
        }
    }
}

impl From<Vec<MediaType>> for Accept {
    fn from(types: Vec<MediaType>) -> Self {
        Self::Listed(types)
    }
}

impl fmt::Display for Accept {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, media_type) in self.types().iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{media_type}")?;
        }
        Ok(())
    }
}

/// Parses a list of media type strings, failing on the first invalid entry.
pub fn parse_list<I, S>(items: I) -> Result<Vec<MediaType>, MediaTypeError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    items.into_iter().map(|s| MediaType::parse(s.as_ref())).collect()
}

fn is_token(s: &str) -> bool {
    !s.is_empty()
        && s
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"!#$&-^_.+*".contains(&b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mt(s: &str) -> MediaType {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_with_params() {
        let m = mt("text/html; charset=\"UTF-8\"; level=1");
        assert_eq!(m.type_(), "text");
        assert_eq!(m.subtype(), "html");
        assert_eq!(m.param("charset"), Some("UTF-8"));
        assert_eq!(m.param("level"), Some("1"));
        assert_eq!(m.to_string(), "text/html; charset=UTF-8; level=1");
    }

    #[test]
    fn test_parse_bare_star() {
        assert!(mt("*").is_wildcard());
        assert_eq!(mt(MediaType::WILDCARD), MediaType::wildcard());
    }

    #[test]
    fn test_parse_invalid() {
        assert!(MediaType::parse("json").is_err());
        assert!(MediaType::parse("").is_err());
        assert!(MediaType::parse("*/json").is_err());
        assert!(MediaType::parse("text/ plain x").is_err());
    }

    #[test]
    fn test_specificity() {
        assert_eq!(mt("*/*").specificity(), 0);
        assert_eq!(mt("text/*").specificity(), 1);
        assert_eq!(mt("text/plain").specificity(), 2);
    }

    #[test]
    fn test_compatibility() {
        assert!(mt("*/*").is_compatible(&mt("image/png")));
        assert!(mt("image/png").is_compatible(&mt("*/*")));
        assert!(mt("image/*").is_compatible(&mt("image/png")));
        assert!(!mt("image/*").is_compatible(&mt("text/plain")));
        assert!(mt("application/json; charset=utf-8").is_compatible(&mt("application/json")));
        assert!(!mt("application/json").is_compatible(&mt("application/xml")));
    }

    #[test]
    fn test_parse_accept_keeps_order() {
        let accept = parse_accept("text/plain, application/json;q=0.9, , bogus, */*;q=0.1");
        let essences: Vec<_> = accept.iter().map(MediaType::essence).collect();
        assert_eq!(essences, vec!["text/plain", "application/json", "*/*"]);
    }

    #[test]
    fn test_parse_list() {
        assert_eq!(parse_list(["text/plain"]).unwrap(), vec![MediaType::text_plain()]);
        assert!(parse_list(["text/plain", "nope"]).is_err());
    }

    #[test]
    fn test_content_type_from_header() {
        assert_eq!(ContentType::from_header(None), ContentType::Absent);
        assert_eq!(
            ContentType::from_header(Some("application/json")),
            ContentType::Valid(MediaType::json())
        );

        let invalid = ContentType::from_header(Some("garbage"));
        assert_eq!(invalid, ContentType::Invalid("garbage".into()));
        assert!(invalid.media_type().is_none());
        assert_eq!(invalid.to_string(), "garbage");
    }

    #[test]
    fn test_accept_from_headers() {
        assert_eq!(Accept::from_headers(std::iter::empty()), Accept::Any);
        assert!(Accept::Any.allows(&MediaType::json()));

        let listed = Accept::from_headers(["text/plain", "application/json;q=0.5"]);
        assert_eq!(listed.types().len(), 2);
        assert!(listed.allows(&mt("text/*")));
        assert!(!listed.allows(&mt("image/png")));
        assert_eq!(listed.to_string(), "text/plain, application/json; q=0.5");
    }

    #[test]
    fn test_accept_with_no_valid_entry_allows_nothing() {
        let accept = Accept::from_headers(["garbage"]);
        assert_eq!(accept, Accept::Listed(Vec::new()));
        assert!(!accept.allows(&MediaType::json()));
        assert!(!accept.allows(&MediaType::wildcard()));
    }
}
