//! Inbound requests.
//!
//! A [`Request`] is the already-parsed message handed over by the transport.
//! Its body is either fully materialized ([`Body::Full`]) or a lazy sequence
//! of chunks ([`Body::Chunked`]) that ends when the stream ends.

use std::fmt;

use bytes::{Bytes, BytesMut};
use futures_util::stream::{self, BoxStream, StreamExt};
use http::header::{ACCEPT, CONTENT_TYPE};
use http::{HeaderMap, HeaderName, HeaderValue, Method, Uri, Version};
use thiserror::Error;

use crate::media::{Accept, ContentType, MediaType};

/// Stream of body chunks as delivered by the transport.
pub type ChunkStream = BoxStream<'static, Result<Bytes, BodyError>>;

/// Failure reported by the transport while a body was being read.
#[derive(Debug, Error)]
pub enum BodyError {
    /// The connection failed mid-body.
    #[error("body transport error: {0}")]
    Transport(String),

    /// An I/O error surfaced while reading the body.
    #[error("body I/O error")]
    Io(#[from] std::io::Error),
}

/// A request body.
pub enum Body {
    /// The whole body, already assembled.
    Full(Bytes),
    /// Successive chunks; the end of the stream is the end marker.
    Chunked(ChunkStream),
}

impl Body {
    /// An empty, fully materialized body.
    #[must_use]
    pub fn empty() -> Self {
        Self::Full(Bytes::new())
    }

    /// A chunked body over an in-memory sequence.
    pub fn from_chunks<I>(chunks: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Bytes>,
    {
        let chunks: Vec<Result<Bytes, BodyError>> =
            chunks.into_iter().map(|c| Ok(c.into())).collect();
        Self::Chunked(stream::iter(chunks).boxed())
    }

    /// A chunked body over an arbitrary stream.
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: futures_util::Stream<Item = Result<Bytes, BodyError>> + Send + 'static,
    {
        Self::Chunked(stream.boxed())
    }

    /// Returns true for chunked bodies.
    #[must_use]
    pub fn is_chunked(&self) -> bool {
        matches!(self, Self::Chunked(_))
    }

    /// Aggregates the body into a single buffer.
    pub async fn collect(self) -> Result<Bytes, BodyError> {
        match self {
            Self::Full(bytes) => Ok(bytes),
            Self::Chunked(mut chunks) => {
                let mut buf = BytesMut::new();
                while let Some(chunk) = chunks.next().await {
                    buf.extend_from_slice(&chunk?);
                }
                Ok(buf.freeze())
            }
        }
    }

    /// Converts the body into a chunk stream.
    ///
    /// A non-empty full body yields one chunk, an empty one yields none.
    #[must_use]
    pub fn into_stream(self) -> ChunkStream {
        match self {
            Self::Full(bytes) if bytes.is_empty() => stream::empty().boxed(),
            Self::Full(bytes) => stream::once(async move { Ok(bytes) }).boxed(),
            Self::Chunked(chunks) => chunks,
        }
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full(bytes) => f.debug_tuple("Full").field(&bytes.len()).finish(),
            Self::Chunked(_) => f.write_str("Chunked(..)"),
        }
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Self::Full(bytes)
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Full(bytes.into())
    }
}

impl From<String> for Body {
    fn from(s: String) -> Self {
        Self::Full(s.into())
    }
}

impl From<&'static str> for Body {
    fn from(s: &'static str) -> Self {
        Self::Full(Bytes::from_static(s.as_bytes()))
    }
}

impl From<()> for Body {
    fn from((): ()) -> Self {
        Self::empty()
    }
}

/// An inbound request.
///
/// # Example
///
/// ```
/// use hermes_core::{MediaType, Request};
/// use http::Method;
///
/// let request = Request::builder()
///     .method(Method::POST)
///     .uri("/users?dry_run=true")
///     .content_type("application/json")
///     .accept("text/plain, application/json")
///     .body(r#"{"name":"ada"}"#)
///     .unwrap();
///
/// assert_eq!(request.path(), "/users");
/// assert_eq!(request.content_type(), Some(MediaType::json()));
/// assert_eq!(request.accept_types().len(), 2);
/// ```
#[derive(Debug)]
pub struct Request {
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
    body: Body,
}

impl Request {
    /// Creates a request with no headers and an empty body.
    #[must_use]
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            version: Version::HTTP_11,
            headers: HeaderMap::new(),
            body: Body::empty(),
        }
    }

    /// Starts building a request.
    #[must_use]
    pub fn builder() -> RequestBuilder {
        RequestBuilder::new()
    }

    /// HTTP method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Raw request URI.
    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Path portion of the URI.
    #[must_use]
    pub fn path(&self) -> &str {
        self.uri.path()
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

    /// Mutable request headers.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Parsed `Content-Type`, if present and valid.
    #[must_use]
    pub fn content_type(&self) -> Option<MediaType> {
        match self.declared_content_type() {
            ContentType::Valid(media_type) => Some(media_type),
            ContentType::Absent | ContentType::Invalid(_) => None,
        }
    }

    /// `Content-Type` as declared: absent, valid, or invalid.
    #[must_use]
    pub fn declared_content_type(&self) -> ContentType {
        let raw = self
            .headers
            .get(CONTENT_TYPE)
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned());
        ContentType::from_header(raw.as_deref())
    }

    /// The caller's `Accept` declaration.
    ///
    /// Repeated `Accept` headers are concatenated in the order received.
    /// Values that are not visible ASCII contribute no entries.
    #[must_use]
    pub fn accept(&self) -> Accept {
        let values: Vec<&str> = self
            .headers
            .get_all(ACCEPT)
            .iter()
            .map(|v| v.to_str().unwrap_or_default())
            .collect();
        Accept::from_headers(values)
    }

    /// Acceptable media types in the caller's order; empty without `Accept`.
    #[must_use]
    pub fn accept_types(&self) -> Vec<MediaType> {
        match self.accept() {
            Accept::Any => Vec::new(),
            Accept::Listed(types) => types,
        }
    }

    /// The body.
    #[must_use]
    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Consumes the request, returning its body.
    #[must_use]
    pub fn into_body(self) -> Body {
        self.body
    }
}

impl<B: Into<Body>> From<http::Request<B>> for Request {
    fn from(request: http::Request<B>) -> Self {
        let (parts, body) = request.into_parts();
        Self {
            method: parts.method,
            uri: parts.uri,
            version: parts.version,
            headers: parts.headers,
            body: body.into(),
        }
    }
}

/// Builder for [`Request`], backed by [`http::request::Builder`].
#[derive(Debug, Default)]
pub struct RequestBuilder {
    inner: http::request::Builder,
}

impl RequestBuilder {
    /// Creates a builder for `GET /` over HTTP/1.1.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the method.
    #[must_use]
    pub fn method<M>(self, method: M) -> Self
    where
        M: TryInto<Method>,
        <M as TryInto<Method>>::Error: Into<http::Error>,
    {
        Self {
            inner: self.inner.method(method),
        }
    }

    /// Sets the URI.
    #[must_use]
    pub fn uri<U>(self, uri: U) -> Self
    where
        U: TryInto<Uri>,
        <U as TryInto<Uri>>::Error: Into<http::Error>,
    {
        Self {
            inner: self.inner.uri(uri),
        }
    }

    /// Sets the protocol version.
    #[must_use]
    pub fn version(self, version: Version) -> Self {
        Self {
            inner: self.inner.version(version),
        }
    }

    /// Appends a header.
    #[must_use]
    pub fn header<K, V>(self, key: K, value: V) -> Self
    where
        K: TryInto<HeaderName>,
        <K as TryInto<HeaderName>>::Error: Into<http::Error>,
        V: TryInto<HeaderValue>,
        <V as TryInto<HeaderValue>>::Error: Into<http::Error>,
    {
        Self {
            inner: self.inner.header(key, value),
        }
    }

    /// Sets `Content-Type`.
    #[must_use]
    pub fn content_type(self, media_type: &str) -> Self {
        self.header(CONTENT_TYPE, media_type)
    }

    /// Appends an `Accept` header.
    #[must_use]
    pub fn accept(self, media_types: &str) -> Self {
        self.header(ACCEPT, media_types)
    }

    /// Finishes the request with `body`.
    pub fn body(self, body: impl Into<Body>) -> Result<Request, http::Error> {
        self.inner.body(body.into()).map(Request::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let request = Request::builder().body(()).unwrap();
        assert_eq!(request.method(), Method::GET);
        assert_eq!(request.path(), "/");
        assert_eq!(request.version(), Version::HTTP_11);
        assert!(request.content_type().is_none());
        assert!(request.accept_types().is_empty());
    }

    #[test]
    fn test_builder_rejects_invalid_uri() {
        assert!(Request::builder().uri("not a uri").body(()).is_err());
    }

    #[test]
    fn test_invalid_content_type_is_kept_apart() {
        let request = Request::builder().content_type("json").body(()).unwrap();
        assert!(request.content_type().is_none());
        assert_eq!(
            request.declared_content_type(),
            ContentType::Invalid("json".into())
        );

        let request = Request::builder().body(()).unwrap();
        assert_eq!(request.declared_content_type(), ContentType::Absent);
    }

    #[test]
    fn test_accept_declared_without_valid_entries() {
        let request = Request::builder().accept("garbage").body(()).unwrap();
        assert_eq!(request.accept(), Accept::Listed(Vec::new()));
        assert!(request.accept_types().is_empty());

        let request = Request::builder().body(()).unwrap();
        assert_eq!(request.accept(), Accept::Any);
    }

    #[test]
    fn test_repeated_accept_headers_concatenate() {
        let request = Request::builder()
            .accept("text/plain")
            .accept("application/json, */*")
            .body(())
            .unwrap();
        let essences: Vec<_> = request.accept_types().iter().map(MediaType::essence).collect();
        assert_eq!(essences, vec!["text/plain", "application/json", "*/*"]);
    }

    #[test]
    fn test_from_http_request() {
        let request: Request = http::Request::builder()
            .method("PUT")
            .uri("/items/3")
            .body(Bytes::from_static(b"abc"))
            .unwrap()
            .into();
        assert_eq!(request.method(), Method::PUT);
        assert!(matches!(request.body(), Body::Full(b) if b.as_ref() == b"abc"));
    }

    #[tokio::test]
    async fn test_collect_chunked() {
        let body = Body::from_chunks(vec!["ab", "", "cd"]);
        assert!(body.is_chunked());
        assert_eq!(body.collect().await.unwrap(), Bytes::from_static(b"abcd"));
    }

    #[tokio::test]
    async fn test_collect_surfaces_transport_error() {
        let body = Body::from_stream(stream::iter(vec![
            Ok(Bytes::from_static(b"ab")),
            Err(BodyError::Transport("reset".into())),
        ]));
        assert!(matches!(body.collect().await, Err(BodyError::Transport(_))));
    }

    #[tokio::test]
    async fn test_into_stream_from_full() {
        let chunks: Vec<_> = Body::from("xyz").into_stream().collect().await;
        assert_eq!(chunks.len(), 1);

        let chunks: Vec<_> = Body::empty().into_stream().collect().await;
        assert!(chunks.is_empty());
    }
}
