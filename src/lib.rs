//! # requestid
//!
//! Request ID middleware. Every request that passes through it gets a
//! correlation ID: stored on the request for your handlers and logs, and
//! echoed to the client in `X-Request-Id`.
//!
//! ## The contract
//!
//! - An ID already staged by an earlier middleware is kept as is.
//! - Otherwise the client's `X-Request-Id` is trusted, or a UUID v4 is made.
//! - [`Generator::Hash`] derives the ID from the request itself instead.
//!   Identical requests share an ID; that is the point.
//! - A request that cannot get an ID never reaches your handler. It gets a
//!   `500 Internal Server Error` (or your own error handler).
//!
//! Not a tracing system: no spans, no sampling, one header.
//!
//! ## Quick start
//!
//! ```rust
//! use requestid::{Request, RequestId, Response};
//!
//! async fn get_user(req: Request) -> Response {
//!     let id = requestid::get(&req);
//!     Response::json(format!(r#"{{"request_id":"{id}"}}"#))
//! }
//!
//! # async fn run() {
//! let app = RequestId::new().wrap(get_user);
//!
//! let req = Request::from(http::Request::get("/users/42").body(bytes::Bytes::new()).unwrap());
//! let res = app.run(req).await;
//! assert!(res.header("x-request-id").is_some());
//! # }
//! ```
//!
//! Serving it with hyper takes one conversion each way:
//! `Request::from(http::Request<Bytes>)` and [`Response::into_http`]. See
//! `demos/basic.rs`.

mod dump;
mod error;
mod handler;
mod request;
mod response;
mod store;

pub mod generator;
pub mod middleware;

pub use dump::{dump_request, hash};
pub use error::Error;
pub use generator::{Generate, Generator, X_REQUEST_ID};
pub use handler::{Handler, Next};
pub use middleware::{RequestId, RequestIdBuilder, RequestIdHandler};
pub use request::Request;
pub use response::{IntoResponse, Response, ResponseBuilder};
pub use store::{get, set};
