//! Built-in interceptors.

pub mod request_id;

pub use request_id::{RequestIdInterceptor, REQUEST_ID_HEADER};
