//! Request-scoped storage for the request ID.
//!
//! The ID lives in the request's [`Extensions`](http::Extensions) under a
//! private key type, so nothing else stored there can collide with it. It is
//! dropped together with the request.

use crate::request::Request;

/// Private extension key.
#[derive(Clone)]
struct StoredId(String);

/// Attaches `id` to `req` and hands the request back.
///
/// Replaces an ID attached earlier. The response header is not touched: a
/// caller that overrides the ID must set the header itself if the client is
/// meant to see the new value.
pub fn set(mut req: Request, id: impl Into<String>) -> Request {
    req.parts.extensions.insert(StoredId(id.into()));
    req
}

/// The ID attached to `req`, or `""` when the request never went through the
/// middleware (or through [`set`]).
pub fn get(req: &Request) -> &str {
    req.parts.extensions.get::<StoredId>().map_or("", |id| id.0.as_str())
}
