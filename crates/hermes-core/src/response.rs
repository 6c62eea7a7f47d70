//! Outbound responses and the completion callback.

use std::fmt;

use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use serde::Serialize;
use tokio::sync::oneshot;

use crate::media::MediaType;

/// An outbound response.
///
/// A fresh response is `200 OK` with media type `*/*`; the dispatcher
/// replaces the media type with the negotiated one before the handler runs.
///
/// # Example
///
/// ```
/// use hermes_core::{MediaType, Response};
/// use http::StatusCode;
///
/// let response = Response::new()
///     .with_status(StatusCode::CREATED)
///     .with_media_type(MediaType::text_plain())
///     .with_body("created");
///
/// let http = response.into_http();
/// assert_eq!(http.status(), StatusCode::CREATED);
/// assert_eq!(http.headers()["content-type"], "text/plain");
/// assert_eq!(http.headers()["content-length"], "7");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    status: StatusCode,
    media_type: MediaType,
    headers: HeaderMap,
    body: Bytes,
}

impl Response {
    /// `200 OK`, `*/*`, no headers, empty body.
    #[must_use]
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            media_type: MediaType::wildcard(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// The minimal response used for dispatcher-generated failures:
    /// `text/plain` with an empty body.
    #[must_use]
    pub fn empty(status: StatusCode) -> Self {
        Self::new()
            .with_status(status)
            .with_media_type(MediaType::text_plain())
    }

    /// A JSON response serialized from `value`.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        let body = serde_json::to_vec(value)?;
        Ok(Self::new()
            .with_media_type(MediaType::json())
            .with_body(body))
    }

    /// Status code.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Sets the status code.
    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    /// Resolved media type.
    #[must_use]
    pub fn media_type(&self) -> &MediaType {
        &self.media_type
    }

    /// Sets the media type.
    pub fn set_media_type(&mut self, media_type: MediaType) {
        self.media_type = media_type;
    }

    /// Response headers, excluding `Content-Type` and `Content-Length`
    /// which are derived on conversion.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Mutable response headers.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Response body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Replaces the body.
    pub fn set_body(&mut self, body: impl Into<Bytes>) {
        self.body = body.into();
    }

    /// Builder-style [`Response::set_status`].
    #[must_use]
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Builder-style [`Response::set_media_type`].
    #[must_use]
    pub fn with_media_type(mut self, media_type: MediaType) -> Self {
        self.media_type = media_type;
        self
    }

    /// Builder-style header insertion.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Builder-style [`Response::set_body`].
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Merges `other` into this response: status and body are taken from
    /// `other`, and its headers override same-named headers here. The media
    /// type is taken from `other` unless it is still the `*/*` wildcard.
    pub fn merge(&mut self, other: Response) {
        self.status = other.status;
        if !other.media_type.is_wildcard() {
            self.media_type = other.media_type;
        }
        self.body = other.body;
        let mut last = None;
        for (name, value) in other.headers {
            // `None` names continue the previous name's values.
            let name = match name {
                Some(name) => {
                    self.headers.remove(&name);
                    last = Some(name.clone());
                    name
                }
                None => match last.clone() {
                    Some(name) => name,
                    None => continue,
                },
            };
            self.headers.append(name, value);
        }
    }

    /// Converts into an [`http::Response`].
    ///
    /// `Content-Type` is set unless the media type is still the `*/*`
    /// wildcard; `Content-Length` always reflects the body.
    #[must_use]
    pub fn into_http(self) -> http::Response<Bytes> {
        let mut response = http::Response::new(self.body);
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;

        if !self.media_type.is_wildcard() {
            if let Ok(value) = HeaderValue::from_str(&self.media_type.to_string()) {
                response.headers_mut().insert(CONTENT_TYPE, value);
            }
        }
        let len = response.body().len();
        response
            .headers_mut()
            .insert(CONTENT_LENGTH, HeaderValue::from(len));
        response
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

/// Single-shot sink for the final response of one dispatch.
///
/// [`CompletionCallback::done`] takes `self` by value, so a callback can
/// deliver at most once; the dispatcher guarantees it delivers at least once.
///
/// # Example
///
/// ```
/// use hermes_core::{CompletionCallback, Response};
///
/// # tokio_test::block_on(async {
/// let (callback, rx) = CompletionCallback::channel();
/// callback.done(Response::new());
/// assert_eq!(rx.await.unwrap().status(), 200);
/// # });
/// ```
pub struct CompletionCallback {
    inner: Box<dyn FnOnce(Response) + Send>,
}

impl CompletionCallback {
    /// Wraps a closure.
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce(Response) + Send + 'static,
    {
        Self { inner: Box::new(f) }
    }

    /// A callback that forwards the response into a oneshot channel.
    #[must_use]
    pub fn channel() -> (Self, oneshot::Receiver<Response>) {
        let (tx, rx) = oneshot::channel();
        let callback = Self::new(move |response| {
            // The receiver may have gone away; nothing left to notify.
            let _ = tx.send(response);
        });
        (callback, rx)
    }

    /// Delivers the final response.
    pub fn done(self, response: Response) {
        (self.inner)(response);
    }
}

impl fmt::Debug for CompletionCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionCallback").finish_non_exhaustive()
    }
}
