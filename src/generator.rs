//! Request ID derivation strategies.
//!
//! A strategy sees the headers staged for the response and the request, and
//! returns the ID. An empty string means "could not derive one"; the
//! middleware answers such requests with its error responder.
//!
//! | Strategy | ID |
//! |---|---|
//! | [`Generator::Default`] | staged `X-Request-Id`, else the request's `X-Request-Id`, else a new UUID v4 |
//! | [`Generator::Hash`] | SHA-1 of the request dump (not unique) |
//! | [`Generator::Custom`] | whatever your [`Generate`] returns |

use std::fmt;
use std::sync::Arc;

use http::{HeaderMap, HeaderName, HeaderValue};
use rand::TryRngCore;
use rand::rngs::OsRng;
use tracing::warn;

use crate::dump;
use crate::error::Error;
use crate::request::Request;

/// `x-request-id`, read from requests and written to responses.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// The capability every strategy provides.
///
/// Closures of the right shape implement it:
///
/// ```rust
/// use requestid::{Generator, Request, X_REQUEST_ID};
/// use http::{HeaderMap, HeaderValue};
///
/// let from_trace_header = Generator::custom(|headers: &mut HeaderMap, req: &Request| {
///     let id = req.header("x-trace-id").unwrap_or_default().to_owned();
///     if let Ok(value) = HeaderValue::from_str(&id) {
///         headers.insert(X_REQUEST_ID, value);
///     }
///     id
/// });
/// ```
pub trait Generate: Send + Sync + 'static {
    /// Returns the request ID, or `""` on failure. Must not panic.
    fn generate(&self, headers: &mut HeaderMap, req: &Request) -> String;
}

impl<F> Generate for F
where
    F: Fn(&mut HeaderMap, &Request) -> String + Send + Sync + 'static,
{
    fn generate(&self, headers: &mut HeaderMap, req: &Request) -> String {
        self(headers, req)
    }
}

/// The strategies the middleware can be configured with.
#[derive(Clone, Default)]
pub enum Generator {
    /// Keep an already staged ID, adopt the client's, or make a UUID v4.
    #[default]
    Default,
    /// Content-addressed ID: hex SHA-1 over the request line and headers,
    /// plus the body when `include_body` is set.
    Hash { include_body: bool },
    /// A user-supplied strategy.
    Custom(Arc<dyn Generate>),
}

impl Generator {
    pub fn hash(include_body: bool) -> Self {
        Self::Hash { include_body }
    }

    pub fn custom(generator: impl Generate) -> Self {
        Self::Custom(Arc::new(generator))
    }
}

impl Generate for Generator {
    fn generate(&self, headers: &mut HeaderMap, req: &Request) -> String {
        match self {
            Self::Default => default_id(headers, req),
            Self::Hash { include_body } => hash_id(headers, req, *include_body),
            Self::Custom(custom) => custom.generate(headers, req),
        }
    }
}

impl fmt::Debug for Generator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("Default"),
            Self::Hash { include_body } => {
                f.debug_struct("Hash").field("include_body", include_body).finish()
            }
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// The [`Generator::Default`] strategy as a plain function.
pub fn default_id(headers: &mut HeaderMap, req: &Request) -> String {
    flatten(try_default_id(headers, req))
}

/// The [`Generator::Hash`] strategy as a plain function.
pub fn hash_id(headers: &mut HeaderMap, req: &Request, include_body: bool) -> String {
    // A failed hash stages an empty value, which the default logic treats as
    // absent.
    let digest = dump::hash(req, include_body);
    match HeaderValue::from_str(&digest) {
        Ok(value) => {
            headers.insert(X_REQUEST_ID, value);
        }
        Err(e) => warn!(error = %e, "digest is not a header value"),
    }
    default_id(headers, req)
}

fn try_default_id(headers: &mut HeaderMap, req: &Request) -> Result<String, Error> {
    // Staged by an earlier link of the chain.
    if let Some(id) = headers.get(X_REQUEST_ID).and_then(as_id) {
        return Ok(id.to_owned());
    }

    // The client's value is staged as received, byte for byte.
    let client = req.headers().get(X_REQUEST_ID);
    let (id, value) = match client.and_then(as_id).zip(client) {
        Some((id, value)) => (id.to_owned(), value.clone()),
        None => {
            let id = new_uuid()?;
            let value = HeaderValue::from_str(&id)
                .map_err(|source| Error::InvalidHeaderValue { id: id.clone(), source })?;
            (id, value)
        }
    };

    headers.insert(X_REQUEST_ID, value);
    Ok(id)
}

/// A hyphenated UUID v4 built straight from the OS random source.
pub fn new_uuid() -> Result<String, Error> {
    let mut bytes = [0u8; 16];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| Error::Entropy(Box::new(e)))?;
    Ok(uuid::Builder::from_random_bytes(bytes)
        .into_uuid()
        .hyphenated()
        .to_string())
}

/// Non-empty UTF-8 header value. Anything else reads as absent.
fn as_id(value: &HeaderValue) -> Option<&str> {
    std::str::from_utf8(value.as_bytes()).ok().filter(|id| !id.is_empty())
}

fn flatten(result: Result<String, Error>) -> String {
    result.unwrap_or_else(|e| {
        warn!(error = %e, "failed to derive request id");
        String::new()
    })
}
