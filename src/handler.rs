//! Handler trait, type erasure and [`Next`].
//!
//! # How a chain is stored
//!
//! A middleware has to hold "the rest of the chain" without knowing its
//! concrete type: a user `async fn`, another middleware, or a closure that
//! does some work and then delegates. All of them are hidden behind one trait
//! object (`dyn ErasedHandler`):
//!
//! ```text
//! async fn hello(req: Request) -> Response { … }   ← user writes this
//!        ↓ RequestId::new().wrap(hello)
//! hello.into_boxed_handler()                       ← Handler blanket impl
//!        ↓
//! Arc::new(FnHandler(hello))                       ← stored as BoxedHandler
//!        ↓
//! handler.call(req)  at request time               ← one vtable dispatch
//! ```
//!
//! A wrapped handler is a [`Handler`] again, so wrappers nest.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::request::Request;
use crate::response::{IntoResponse, Response};

// ── Internal types ────────────────────────────────────────────────────────────

/// A heap-allocated, type-erased future that resolves to a [`Response`].
pub(crate) type BoxFuture = Pin<Box<dyn Future<Output = Response> + Send + 'static>>;

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` rather than `pub(crate)` because it appears in the
/// return type of the public `Handler` trait's `into_boxed_handler` method.
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, req: Request) -> BoxFuture;
}

/// A type-erased handler shared across concurrent requests.
#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

// ── Public Handler trait ──────────────────────────────────────────────────────

/// Implemented for everything that can sit in a handler chain.
///
/// You never implement this yourself. It is satisfied by:
///
/// - any `async fn name(req: Request) -> impl IntoResponse`, or closure of
///   that shape;
/// - [`RequestIdHandler`](crate::RequestIdHandler), the wrapped form of a
///   handler;
/// - [`Next`].
///
/// The trait is sealed so the set of implementations stays closed.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

pub(crate) mod private {
    pub trait Sealed {}
}

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

/// Bridges a concrete function to the trait-object world.
struct FnHandler<F>(F);

impl<F, Fut, R> ErasedHandler for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture {
        let fut = (self.0)(req);
        Box::pin(async move { fut.await.into_response() })
    }
}

// ── Next ──────────────────────────────────────────────────────────────────────

/// The rest of a handler chain, callable from your own middleware.
///
/// ```rust
/// use requestid::{Next, Request, RequestId, Response};
///
/// async fn show(req: Request) -> Response {
///     Response::text(requestid::get(&req).to_owned())
/// }
///
/// let next = Next::new(show);
/// let pin_id = move |req: Request| next.run(requestid::set(req, "pinned"));
///
/// let app = RequestId::new().wrap(pin_id);
/// ```
#[derive(Clone)]
pub struct Next(BoxedHandler);

impl Next {
    pub fn new(handler: impl Handler) -> Self {
        Self(handler.into_boxed_handler())
    }

    /// Runs the wrapped handler. The returned future does not borrow `self`.
    ///
    /// Headers staged on `req` are merged into the response, leaving names
    /// the handler set itself alone.
    pub fn run(&self, req: Request) -> impl Future<Output = Response> + Send + use<> {
        let staged = req.response_headers.clone();
        let fut = self.0.call(req);
        async move {
            let mut res = fut.await;
            res.merge_headers(&staged);
            res
        }
    }
}

impl fmt::Debug for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next").finish_non_exhaustive()
    }
}

impl private::Sealed for Next {}

impl Handler for Next {
    fn into_boxed_handler(self) -> BoxedHandler {
        self.0
    }
}
