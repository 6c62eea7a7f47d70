//! Test request building.

use bytes::Bytes;
use hermes_core::{Body, Request};
use http::header::{ACCEPT, CONNECTION, CONTENT_TYPE};
use http::{HeaderMap, HeaderName, HeaderValue, Method, Uri, Version};
use serde::Serialize;

/// Entry points for building dispatcher requests in tests.
pub struct TestRequest;

impl TestRequest {
    /// Creates a new GET request.
    pub fn get(uri: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::GET, uri)
    }

    /// Creates a new POST request.
    pub fn post(uri: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::POST, uri)
    }

    /// Creates a new PUT request.
    pub fn put(uri: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::PUT, uri)
    }

    /// Creates a new PATCH request.
    pub fn patch(uri: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::PATCH, uri)
    }

    /// Creates a new DELETE request.
    pub fn delete(uri: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::DELETE, uri)
    }
}

/// Builder for test requests.
///
/// Panics on invalid header names or values, which is what a test wants.
#[must_use]
pub struct TestRequestBuilder {
    method: Method,
    uri: String,
    version: Version,
    headers: HeaderMap,
    body: Body,
}

impl TestRequestBuilder {
    /// Creates a new request builder.
    pub fn new(method: Method, uri: impl AsRef<str>) -> Self {
        Self {
            method,
            uri: uri.as_ref().to_string(),
            version: Version::HTTP_11,
            headers: HeaderMap::new(),
            body: Body::empty(),
        }
    }

    /// Appends a header.
    ///
    /// # Example
    ///
    /// ```
    /// use hermes_test::TestRequest;
    ///
    /// let request = TestRequest::get("/users")
    ///     .header("Authorization", "Bearer token")
    ///     .header("X-Tenant", "acme")
    ///     .build();
    /// assert_eq!(request.headers()["x-tenant"], "acme");
    /// ```
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        let name = HeaderName::try_from(name.as_ref()).expect("valid header name");
        let value = HeaderValue::try_from(value.as_ref()).expect("valid header value");
        self.headers.append(name, value);
        self
    }

    /// Sets the Content-Type header.
    pub fn content_type(self, content_type: impl AsRef<str>) -> Self {
        self.header(CONTENT_TYPE.as_str(), content_type)
    }

    /// Appends an Accept header.
    pub fn accept(self, accept: impl AsRef<str>) -> Self {
        self.header(ACCEPT.as_str(), accept)
    }

    /// Sets the Connection header.
    pub fn connection(self, value: impl AsRef<str>) -> Self {
        self.header(CONNECTION.as_str(), value)
    }

    /// Sets the protocol version (HTTP/1.1 by default).
    pub fn version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    /// Sets a fully materialized body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Body::Full(body.into());
        self
    }

    /// Sets a chunked body delivered in the given order.
    pub fn chunks<I>(mut self, chunks: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Bytes>,
    {
        self.body = Body::from_chunks(chunks);
        self
    }

    /// Sets an arbitrary body, e.g. a stream that fails midway.
    pub fn raw_body(mut self, body: Body) -> Self {
        self.body = body;
        self
    }

    /// Sets a JSON body and the `application/json` content type.
    pub fn json<T: Serialize>(self, value: &T) -> Self {
        let body = serde_json::to_vec(value).expect("serializable value");
        self.content_type("application/json").body(body)
    }

    /// Builds the request.
    pub fn build(self) -> Request {
        let uri: Uri = self.uri.parse().expect("valid URI");
        let mut builder = http::Request::builder()
            .method(self.method)
            .uri(uri)
            .version(self.version);
        if let Some(headers) = builder.headers_mut() {
            *headers = self.headers;
        }
        Request::from(builder.body(self.body).expect("valid request"))
    }
}
