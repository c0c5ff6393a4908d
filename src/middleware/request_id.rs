//! Request ID middleware.
//!
//! Per request:
//!
//! 1. run the configured [`Generator`] against the request and the headers
//!    staged for the response;
//! 2. non-empty ID: attach it with [`set`](crate::set) and call the wrapped
//!    handler;
//! 3. empty ID: call the error handler instead. The wrapped handler never
//!    runs.
//!
//! Either way the staged headers end up on the response, unless the handler
//! set the same header itself.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use http::StatusCode;
use tracing::{debug, warn};

use crate::generator::{Generate, Generator};
use crate::handler::{BoxFuture, BoxedHandler, ErasedHandler, Handler, private};
use crate::request::Request;
use crate::response::Response;
use crate::store;

/// Request ID middleware configuration.
///
/// Build once at startup and wrap as many handlers as you like; clones share
/// the configuration.
///
/// ```rust
/// use requestid::{Generator, Request, RequestId, Response};
///
/// async fn hello(req: Request) -> Response {
///     Response::text(format!("request {}", requestid::get(&req)))
/// }
///
/// // UUID v4 unless the client sent an X-Request-Id.
/// let app = RequestId::new().wrap(hello);
///
/// // Content hash of request line and headers.
/// let app = RequestId::with_generator(Generator::hash(false)).wrap(hello);
/// ```
#[derive(Clone, Debug, Default)]
pub struct RequestId {
    config: Arc<Config>,
}

struct Config {
    generator: Generator,
    error_handler: BoxedHandler,
}

impl RequestId {
    /// [`Generator::Default`] and [`internal_server_error`].
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn with_generator(generator: Generator) -> Self {
        Self::builder().generator(generator).build()
    }

    pub fn builder() -> RequestIdBuilder {
        RequestIdBuilder { generator: Generator::Default, error_handler: None }
    }

    pub fn generator(&self) -> &Generator {
        &self.config.generator
    }

    /// Wraps `next` so every request reaching it carries an ID.
    pub fn wrap(&self, next: impl Handler) -> RequestIdHandler {
        RequestIdHandler { config: Arc::clone(&self.config), next: next.into_boxed_handler() }
    }
}

/// Fluent builder for [`RequestId`].
pub struct RequestIdBuilder {
    generator: Generator,
    error_handler: Option<BoxedHandler>,
}

impl RequestIdBuilder {
    pub fn generator(mut self, generator: Generator) -> Self {
        self.generator = generator;
        self
    }

    /// Replaces [`internal_server_error`] as the response for requests that
    /// did not get an ID.
    pub fn error_handler(mut self, handler: impl Handler) -> Self {
        self.error_handler = Some(handler.into_boxed_handler());
        self
    }

    pub fn build(self) -> RequestId {
        let error_handler =
            self.error_handler.unwrap_or_else(|| internal_server_error.into_boxed_handler());
        RequestId { config: Arc::new(Config { generator: self.generator, error_handler }) }
    }
}

impl fmt::Debug for RequestIdBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestIdBuilder")
            .field("generator", &self.generator)
            .field("custom_error_handler", &self.error_handler.is_some())
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self { generator: Generator::Default, error_handler: internal_server_error.into_boxed_handler() }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config").field("generator", &self.generator).finish_non_exhaustive()
    }
}

/// The default error handler: `500 Internal Server Error` with the status
/// text as a plain-text body.
pub async fn internal_server_error(_req: Request) -> Response {
    let status = StatusCode::INTERNAL_SERVER_ERROR;
    Response::builder()
        .status(status)
        .text(status.canonical_reason().unwrap_or_default())
}

// ── Wrapped handler ───────────────────────────────────────────────────────────

/// A handler wrapped by [`RequestId::wrap`]. Itself a [`Handler`].
#[derive(Clone)]
pub struct RequestIdHandler {
    config: Arc<Config>,
    next: BoxedHandler,
}

impl RequestIdHandler {
    /// Runs one request through the middleware and the wrapped handler.
    pub fn run(&self, req: Request) -> impl Future<Output = Response> + Send + use<> {
        ErasedHandler::call(self, req)
    }
}

impl ErasedHandler for RequestIdHandler {
    fn call(&self, mut req: Request) -> BoxFuture {
        let mut staged = std::mem::take(&mut req.response_headers);
        let id = self.config.generator.generate(&mut staged, &req);
        // Later links see what this one staged.
        req.response_headers = staged.clone();

        let fut = if id.is_empty() {
            warn!(method = %req.method(), path = req.uri().path(), "no request id, responding with error handler");
            self.config.error_handler.call(req)
        } else {
            debug!(request_id = %id, "request id attached");
            self.next.call(store::set(req, id))
        };

        Box::pin(async move {
            let mut res = fut.await;
            res.merge_headers(&staged);
            res
        })
    }
}

impl fmt::Debug for RequestIdHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestIdHandler").field("config", &self.config).finish_non_exhaustive()
    }
}

impl private::Sealed for RequestIdHandler {}

impl Handler for RequestIdHandler {
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(self)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use bytes::Bytes;
    use http::{HeaderMap, HeaderValue};

    use super::*;
    use crate::generator::X_REQUEST_ID;
    use crate::handler::Next;

    fn request(builder: http::request::Builder) -> Request {
        Request::from(builder.body(Bytes::new()).unwrap())
    }

    async fn echo_id(req: Request) -> Response {
        Response::text(store::get(&req).to_owned())
    }

    fn failing() -> Generator {
        Generator::custom(|_: &mut HeaderMap, _: &Request| String::new())
    }

    #[tokio::test]
    async fn attaches_id_and_sets_header() {
        let app = RequestId::new().wrap(echo_id);

        let res = app.run(request(http::Request::get("/"))).await;

        assert_eq!(res.status_code(), StatusCode::OK);
        let id = std::str::from_utf8(res.body()).unwrap();
        assert_eq!(id.len(), 36);
        assert_eq!(res.header("x-request-id"), Some(id));
    }

    #[tokio::test]
    async fn adopts_client_id() {
        let app = RequestId::new().wrap(echo_id);

        let res = app.run(request(http::Request::get("/").header("x-request-id", "abc-123"))).await;

        assert_eq!(res.body(), b"abc-123");
        assert_eq!(res.header("x-request-id"), Some("abc-123"));
    }

    #[tokio::test]
    async fn adopts_utf8_client_id() {
        let client = HeaderValue::from_bytes("café-42".as_bytes()).unwrap();
        let app = RequestId::new().wrap(echo_id);

        let res = app.run(request(http::Request::get("/").header(X_REQUEST_ID, client))).await;

        assert_eq!(res.body(), "café-42".as_bytes());
        assert_eq!(res.headers()[X_REQUEST_ID].as_bytes(), "café-42".as_bytes());
    }

    #[tokio::test]
    async fn empty_id_calls_error_handler_instead_of_next() {
        let next_calls = Arc::new(AtomicUsize::new(0));
        let error_calls = Arc::new(AtomicUsize::new(0));

        let counted_next = {
            let calls = Arc::clone(&next_calls);
            move |_req: Request| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Response::text("next") }
            }
        };
        let counted_error = {
            let calls = Arc::clone(&error_calls);
            move |_req: Request| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { StatusCode::SERVICE_UNAVAILABLE }
            }
        };

        let app = RequestId::builder()
            .generator(failing())
            .error_handler(counted_error)
            .build()
            .wrap(counted_next);

        let res = app.run(request(http::Request::get("/"))).await;

        assert_eq!(res.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(next_calls.load(Ordering::SeqCst), 0);
        assert_eq!(error_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn default_error_handler_is_plain_500() {
        let app = RequestId::with_generator(failing()).wrap(echo_id);

        let res = app.run(request(http::Request::get("/"))).await;

        assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(res.body(), b"Internal Server Error");
        assert_eq!(res.header("content-type"), Some("text/plain; charset=utf-8"));
        assert_eq!(res.header("x-request-id"), None);
    }

    #[tokio::test]
    async fn error_path_keeps_staged_headers() {
        let stage_then_fail = Generator::custom(|headers: &mut HeaderMap, _: &Request| {
            headers.insert("x-attempt", HeaderValue::from_static("1"));
            String::new()
        });
        let app = RequestId::with_generator(stage_then_fail).wrap(echo_id);

        let res = app.run(request(http::Request::get("/"))).await;

        assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(res.header("x-attempt"), Some("1"));
    }

    #[tokio::test]
    async fn nested_middleware_keeps_one_id() {
        let inner = RequestId::new().wrap(|req: Request| async move {
            let staged = req.response_headers().get(X_REQUEST_ID).cloned();
            let id = store::get(&req).to_owned();
            assert_eq!(staged.as_ref().map(|v| v.to_str().unwrap()), Some(id.as_str()));
            Response::text(id)
        });
        let app = RequestId::new().wrap(inner);

        let res = app.run(request(http::Request::get("/"))).await;

        let id = std::str::from_utf8(res.body()).unwrap();
        assert_eq!(res.header("x-request-id"), Some(id));
        assert_eq!(res.headers().get_all(X_REQUEST_ID).iter().count(), 1);
    }

    #[tokio::test]
    async fn inner_hash_replaces_id_staged_outside() {
        let hashed = RequestId::with_generator(Generator::hash(false)).wrap(echo_id);
        let app = RequestId::new().wrap(hashed);

        let res = app.run(request(http::Request::get("/").header("host", "example.com"))).await;

        let digest = "ba5ce1ba53e508a854ca039833eb33c872e895cd";
        assert_eq!(res.body(), digest.as_bytes());
        assert_eq!(res.header("x-request-id"), Some(digest));
        assert_eq!(res.headers().get_all(X_REQUEST_ID).iter().count(), 1);
    }

    #[tokio::test]
    async fn headers_staged_inside_the_wrapper_reach_the_response() {
        let next = Next::new(echo_id);
        let app = RequestId::new().wrap(move |mut req: Request| {
            req.response_headers_mut().insert("x-stage", HeaderValue::from_static("1"));
            next.run(req)
        });

        let res = app.run(request(http::Request::get("/"))).await;

        assert_eq!(res.header("x-stage"), Some("1"));
        assert!(res.header("x-request-id").is_some());
    }

    #[tokio::test]
    async fn handler_header_wins_over_staged() {
        let app = RequestId::new().wrap(|_req: Request| async {
            Response::builder()
                .header(X_REQUEST_ID, HeaderValue::from_static("handler-chose"))
                .no_body()
        });

        let res = app.run(request(http::Request::get("/").header("x-request-id", "client"))).await;

        assert_eq!(res.header("x-request-id"), Some("handler-chose"));
    }

    #[tokio::test]
    async fn config_is_shared_across_routes() {
        let config = RequestId::with_generator(Generator::hash(false));
        let a = config.wrap(echo_id);
        let b = config.clone().wrap(Next::new(echo_id));

        let make = || request(http::Request::get("/").header("host", "example.com"));
        let (ra, rb) = tokio::join!(a.run(make()), b.run(make()));

        assert_eq!(ra.body(), rb.body());
        assert_eq!(ra.body().len(), 40);
        assert!(matches!(config.generator(), Generator::Hash { include_body: false }));
    }
}
