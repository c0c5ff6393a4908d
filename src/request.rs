//! Incoming HTTP request type.

use bytes::Bytes;
use http::request::Parts;
use http::{Extensions, HeaderMap, Method, Uri, Version};

/// An incoming HTTP request with its body already buffered.
///
/// Besides the request itself it carries the *staged response headers*:
/// headers that a link of the handler chain wants on the final response.
/// Middleware writes them before the response exists; the middleware that
/// staged them merges them into whatever response comes back.
pub struct Request {
    pub(crate) parts: Parts,
    pub(crate) body: Bytes,
    pub(crate) response_headers: HeaderMap,
}

impl Request {
    pub fn method(&self) -> &Method { &self.parts.method }
    pub fn uri(&self) -> &Uri { &self.parts.uri }
    pub fn version(&self) -> Version { self.parts.version }
    pub fn headers(&self) -> &HeaderMap { &self.parts.headers }
    pub fn body(&self) -> &[u8] { &self.body }
    pub fn extensions(&self) -> &Extensions { &self.parts.extensions }

    /// Header lookup as `&str`. Values that are not visible ASCII read as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.parts.headers.get(name)?.to_str().ok()
    }

    /// Headers staged for the response by earlier links of the chain.
    pub fn response_headers(&self) -> &HeaderMap { &self.response_headers }

    /// Stages a header for the response. It is merged in when the request is
    /// passed on through [`Next::run`](crate::Next::run) or a
    /// [`RequestIdHandler`](crate::RequestIdHandler).
    pub fn response_headers_mut(&mut self) -> &mut HeaderMap { &mut self.response_headers }
}

impl<B: Into<Bytes>> From<http::Request<B>> for Request {
    fn from(req: http::Request<B>) -> Self {
        let (parts, body) = req.into_parts();
        Self { parts, body: body.into(), response_headers: HeaderMap::new() }
    }
}
