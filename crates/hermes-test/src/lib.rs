//! # Hermes Test
//!
//! Test utilities for the Hermes dispatcher. Everything runs in memory: a
//! request is built with [`TestRequest`], dispatched, and its delivery is
//! observed through a [`DeliveryCapture`].
//!
//! ## Key Features
//!
//! - **Request Builder**: fluent API producing `hermes_core::Request`,
//!   including chunked bodies
//! - **Delivery Capture**: counts completion callback invocations
//! - **Recorders**: interceptors and handlers that log every call into a
//!   shared [`EventLog`], with switches to abort, fail or panic
//!
//! ## Example
//!
//! ```ignore
//! use hermes_test::{EventLog, RecordingInterceptor, DeliveryCapture, TestRequest};
//!
//! #[tokio::test]
//! async fn test_abort_skips_handler() {
//!     let log = EventLog::new();
//!     let dispatcher = dispatcher_with(RecordingInterceptor::new("auth", &log)
//!         .aborting(Response::empty(StatusCode::UNAUTHORIZED)));
//!
//!     let capture = DeliveryCapture::new();
//!     dispatcher.dispatch(TestRequest::get("/users/1").build(), capture.callback()).await;
//!
//!     capture.assert_delivered_once().assert_status(StatusCode::UNAUTHORIZED);
//!     assert!(!log.contains("handler"));
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/hermes-test/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod recording;
mod request;
mod response;

pub use error::TestError;
pub use recording::{EventLog, RecordingHandler, RecordingInterceptor, RecordingStreamHandler};
pub use request::{TestRequest, TestRequestBuilder};
pub use response::{DeliveryCapture, TestResponse};
