//! Transport framing headers.
//!
//! The dispatcher decides whether the connection survives the response and
//! says so in the `Connection` header. HTTP/2 and later carry no
//! `Connection` header at all.

use hermes_core::Response;
use http::header::CONNECTION;
use http::{HeaderMap, HeaderValue, Version};

const CLOSE: &str = "close";
const KEEP_ALIVE: &str = "keep-alive";

/// The `Connection` value for a response to a request with `version` and
/// `headers`, or `None` when the protocol has no such header.
///
/// The connection closes when keep-alive is disabled, when the request asked
/// for `close`, or when an HTTP/1.0 request did not ask for `keep-alive`.
#[must_use]
pub fn connection_value(
    version: Version,
    headers: &HeaderMap,
    keep_alive: bool,
) -> Option<HeaderValue> {
    if version == Version::HTTP_2 || version == Version::HTTP_3 {
        return None;
    }

    let requested = |token: &str| {
        headers.get_all(CONNECTION).iter().any(|value| {
            value.to_str().is_ok_and(|v| {
                v.split(',')
                    .any(|t| t.trim().eq_ignore_ascii_case(token))
            })
        })
    };

    let legacy = version == Version::HTTP_10 || version == Version::HTTP_09;
    let close = !keep_alive || requested(CLOSE) || (legacy && !requested(KEEP_ALIVE));

    Some(HeaderValue::from_static(if close { CLOSE } else { KEEP_ALIVE }))
}

/// Sets a value from [`connection_value`] as the `Connection` header of
/// `response`. `None` leaves the response untouched.
pub fn apply(response: &mut Response, connection: Option<HeaderValue>) {
    if let Some(value) = connection {
        response.headers_mut().insert(CONNECTION, value);
    }
}
