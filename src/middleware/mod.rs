//! Middleware layer.
//!
//! A middleware takes a [`Handler`](crate::Handler) and returns another one
//! that does some work around it. The result is a `Handler` again, so
//! middleware nests and wraps ordinary `async fn` handlers the same way.
//!
//! Built-in middleware:
//! - [`RequestId`]: derives an `X-Request-Id`, stores it on the request and
//!   echoes it on the response.

mod request_id;

pub use request_id::{RequestId, RequestIdBuilder, RequestIdHandler, internal_server_error};
