//! Unified error type.

/// The error type behind a failed request ID derivation.
///
/// Never surfaces to a handler: strategies log it and hand back an empty ID,
/// which the middleware answers with its error responder. It is public so
/// custom [`Generate`](crate::Generate) implementations can reuse the
/// building blocks in [`generator`](crate::generator).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The OS random source could not fill the bytes of a UUID.
    #[error("failed to read random bytes for a request id")]
    Entropy(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The derived ID cannot be sent as an HTTP header value.
    #[error("request id `{id}` is not a valid header value")]
    InvalidHeaderValue {
        id: String,
        #[source]
        source: http::header::InvalidHeaderValue,
    },

    /// Writing the request dump failed.
    #[error("failed to serialize request: {0}")]
    Dump(#[from] std::io::Error),
}
