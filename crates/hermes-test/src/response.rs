//! Delivered response wrapper and completion capture.

use std::fmt;
use std::sync::Arc;

use hermes_core::{CompletionCallback, MediaType, Response};
use http::{HeaderValue, StatusCode};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;

use crate::error::TestError;

/// A delivered response with helper methods for assertions.
#[derive(Clone, PartialEq)]
pub struct TestResponse {
    inner: Response,
}

impl TestResponse {
    /// Wraps a delivered response.
    pub fn new(response: Response) -> Self {
        Self { inner: response }
    }

    /// Returns the status code.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.inner.status()
    }

    /// Returns the resolved media type.
    #[must_use]
    pub fn media_type(&self) -> &MediaType {
        self.inner.media_type()
    }

    /// Gets a header value by name.
    #[must_use]
    pub fn header(&self, name: impl AsRef<str>) -> Option<&HeaderValue> {
        self.inner.headers().get(name.as_ref())
    }

    /// Gets a header value as a string.
    #[must_use]
    pub fn header_str(&self, name: impl AsRef<str>) -> Option<&str> {
        self.header(name).and_then(|v| v.to_str().ok())
    }

    /// Returns the body as a string.
    pub fn text(&self) -> Result<String, TestError> {
        String::from_utf8(self.inner.body().to_vec())
            .map_err(|e| TestError::BodyRead(format!("invalid UTF-8: {e}")))
    }

    /// Deserializes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, TestError> {
        Ok(serde_json::from_slice(self.inner.body())?)
    }

    /// The wrapped response.
    #[must_use]
    pub fn into_inner(self) -> Response {
        self.inner
    }

    // Assertion methods

    /// Asserts that the status code equals the expected value.
    ///
    /// # Panics
    ///
    /// Panics if the status code doesn't match.
    pub fn assert_status(&self, expected: StatusCode) -> &Self {
        assert_eq!(
            self.status(),
            expected,
            "Expected status {}, got {}",
            expected,
            self.status()
        );
        self
    }

    /// Asserts that a header exists with the expected value.
    ///
    /// # Panics
    ///
    /// Panics if the header doesn't exist or doesn't match.
    pub fn assert_header(&self, name: impl AsRef<str>, expected: impl AsRef<str>) -> &Self {
        let name = name.as_ref();
        let expected = expected.as_ref();
        let actual = self
            .header_str(name)
            .unwrap_or_else(|| panic!("Header '{name}' not found"));
        assert_eq!(actual, expected, "Header '{name}'");
        self
    }

    /// Asserts that a header is absent.
    ///
    /// # Panics
    ///
    /// Panics if the header is present.
    pub fn assert_no_header(&self, name: impl AsRef<str>) -> &Self {
        let name = name.as_ref();
        assert!(self.header(name).is_none(), "Header '{name}' should be absent");
        self
    }

    /// Asserts the type and subtype of the resolved media type.
    ///
    /// # Panics
    ///
    /// Panics if the media type doesn't match.
    pub fn assert_media_type(&self, expected: &str) -> &Self {
        assert_eq!(self.media_type().essence(), expected, "Media type mismatch");
        self
    }

    /// Asserts that the body equals the expected string.
    ///
    /// # Panics
    ///
    /// Panics if the body doesn't match.
    pub fn assert_body_eq(&self, expected: impl AsRef<str>) -> &Self {
        let body = self.text().expect("Body should be valid UTF-8");
        assert_eq!(body, expected.as_ref(), "Body mismatch");
        self
    }

    /// Asserts that the body is empty.
    ///
    /// # Panics
    ///
    /// Panics if the body is not empty.
    pub fn assert_empty_body(&self) -> &Self {
        assert!(
            self.inner.body().is_empty(),
            "Expected empty body, got {} bytes",
            self.inner.body().len()
        );
        self
    }
}

impl From<Response> for TestResponse {
    fn from(response: Response) -> Self {
        Self::new(response)
    }
}

impl fmt::Debug for TestResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestResponse")
            .field("status", &self.status())
            .field("media_type", &self.media_type().to_string())
            .field("body", &String::from_utf8_lossy(self.inner.body()))
            .finish()
    }
}

/// Records every response delivered through the callbacks it hands out.
///
/// Completion callbacks are single-shot, so one callback can deliver at most
/// once. The capture checks the other half: that the dispatcher delivered at
/// all, and only through the callback it was given.
///
/// # Example
///
/// ```
/// use hermes_core::Response;
/// use hermes_test::DeliveryCapture;
/// use http::StatusCode;
///
/// let capture = DeliveryCapture::new();
/// capture.callback().done(Response::empty(StatusCode::NOT_FOUND));
///
/// capture.assert_delivered_once().assert_status(StatusCode::NOT_FOUND);
/// ```
#[derive(Clone, Default)]
pub struct DeliveryCapture {
    delivered: Arc<Mutex<Vec<Response>>>,
}

impl DeliveryCapture {
    /// Creates an empty capture.
    pub fn new() -> Self {
        Self::default()
    }

    /// A completion callback that records into this capture.
    pub fn callback(&self) -> CompletionCallback {
        let delivered = Arc::clone(&self.delivered);
        CompletionCallback::new(move |response| delivered.lock().push(response))
    }

    /// Number of deliveries so far.
    #[must_use]
    pub fn deliveries(&self) -> usize {
        self.delivered.lock().len()
    }

    /// The last delivered response.
    pub fn response(&self) -> Result<TestResponse, TestError> {
        self.delivered
            .lock()
            .last()
            .cloned()
            .map(TestResponse::new)
            .ok_or(TestError::NotDelivered)
    }

    /// Asserts exactly one delivery and returns it.
    ///
    /// # Panics
    ///
    /// Panics on zero or several deliveries.
    pub fn assert_delivered_once(&self) -> TestResponse {
        let delivered = self.delivered.lock();
        assert_eq!(
            delivered.len(),
            1,
            "Expected exactly one delivery, got {}",
            delivered.len()
        );
        TestResponse::new(delivered[0].clone())
    }
}

impl fmt::Debug for DeliveryCapture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeliveryCapture")
            .field("deliveries", &self.deliveries())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::CONTENT_TYPE;

    #[test]
    fn test_response_helpers() {
        let response = TestResponse::new(
            Response::new()
                .with_media_type(MediaType::json())
                .with_header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
                .with_body(r#"{"id":7}"#),
        );

        response
            .assert_status(StatusCode::OK)
            .assert_media_type("application/json")
            .assert_header("content-type", "application/json")
            .assert_no_header("x-missing");

        let value: serde_json::Value = response.json().unwrap();
        assert_eq!(value["id"], 7);
    }

    #[test]
    fn test_capture_counts_deliveries() {
        let capture = DeliveryCapture::new();
        assert_eq!(capture.deliveries(), 0);
        assert!(matches!(capture.response(), Err(TestError::NotDelivered)));

        capture.callback().done(Response::new().with_body("one"));
        assert_eq!(capture.deliveries(), 1);
        capture.assert_delivered_once().assert_body_eq("one");

        capture.callback().done(Response::new().with_body("two"));
        assert_eq!(capture.deliveries(), 2);
        capture.response().unwrap().assert_body_eq("two");
    }

    #[test]
    #[should_panic(expected = "exactly one delivery")]
    fn test_assert_delivered_once_panics_without_delivery() {
        DeliveryCapture::new().assert_delivered_once();
    }
}
