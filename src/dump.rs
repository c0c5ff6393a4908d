//! Wire-level request dump and the content hash built on it.
//!
//! The dump is what [`Generator::Hash`](crate::Generator::Hash) digests, so
//! its exact bytes are part of the contract: two requests get the same hash
//! ID if and only if they dump to the same bytes.
//!
//! ```text
//! GET /search?q=1 HTTP/1.1\r\n
//! Host: example.com\r\n
//! Transfer-Encoding: chunked\r\n       (only when present)
//! Accept: */*\r\n                       (canonical names, sorted)
//! User-Agent: curl/8.0\r\n
//! \r\n
//! <body>                               (only with include_body)
//! ```

use std::io::{self, Write};

use http::{HeaderName, HeaderValue};
use http::header::{HOST, TRAILER, TRANSFER_ENCODING};
use sha1::{Digest, Sha1};
use tracing::warn;

use crate::error::Error;
use crate::request::Request;

/// Hex-encoded SHA-1 of the request dump, or `""` if the dump fails.
///
/// Not unique: identical requests share a hash.
pub fn hash(req: &Request, include_body: bool) -> String {
    match try_hash(req, include_body) {
        Ok(digest) => digest,
        Err(e) => {
            warn!(error = %e, "failed to hash request");
            String::new()
        }
    }
}

pub(crate) fn try_hash(req: &Request, include_body: bool) -> Result<String, Error> {
    let dump = dump_request(req, include_body)?;
    Ok(hex::encode(Sha1::digest(&dump)))
}

/// Serializes `req` the way it looked on the wire.
pub fn dump_request(req: &Request, include_body: bool) -> io::Result<Vec<u8>> {
    let mut out = Vec::with_capacity(256 + if include_body { req.body().len() } else { 0 });
    let uri = req.uri();

    // Absolute-form targets carry the host themselves.
    let absolute = uri.scheme().is_some();
    let target = match (absolute, uri.path_and_query(), uri.authority()) {
        (true, _, _) => uri.to_string(),
        (false, Some(pq), _) => pq.as_str().to_owned(),
        (false, None, Some(authority)) => authority.as_str().to_owned(),
        (false, None, None) => "/".to_owned(),
    };
    write!(out, "{} {} {:?}\r\n", req.method(), target, req.version())?;

    if !absolute {
        let host = req
            .headers()
            .get(HOST)
            .map(HeaderValue::as_bytes)
            .filter(|h| !h.is_empty())
            .or_else(|| uri.authority().map(|a| a.as_str().as_bytes()))
            .unwrap_or_default();
        if !host.is_empty() {
            out.extend_from_slice(b"Host: ");
            out.extend_from_slice(host);
            out.extend_from_slice(b"\r\n");
        }
    }

    let codings = req
        .headers()
        .get_all(TRANSFER_ENCODING)
        .iter()
        .map(|v| v.as_bytes())
        .collect::<Vec<_>>();
    let chunked = codings
        .first()
        .is_some_and(|first| trim(first).eq_ignore_ascii_case(b"chunked"));
    if !codings.is_empty() {
        out.extend_from_slice(b"Transfer-Encoding: ");
        out.extend_from_slice(&codings.join(&b","[..]));
        out.extend_from_slice(b"\r\n");
    }

    let mut lines = req
        .headers()
        .keys()
        .filter(|name| ![HOST, TRANSFER_ENCODING, TRAILER].contains(*name))
        .flat_map(|name| {
            let canonical = canonical_name(name);
            req.headers()
                .get_all(name)
                .iter()
                .map(move |value| (canonical.clone(), value.as_bytes()))
        })
        .collect::<Vec<_>>();
    // Stable, so values under one name keep their order.
    lines.sort_by(|(a, _), (b, _)| a.cmp(b));

    for (name, value) in lines {
        out.extend_from_slice(name.as_bytes());
        out.extend_from_slice(b": ");
        out.extend(trim(value).iter().map(|&b| if b == b'\r' || b == b'\n' { b' ' } else { b }));
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(b"\r\n");

    if include_body {
        let body = req.body();
        if chunked {
            if !body.is_empty() {
                write!(out, "{:x}\r\n", body.len())?;
                out.extend_from_slice(body);
                out.extend_from_slice(b"\r\n");
            }
            out.extend_from_slice(b"0\r\n\r\n");
        } else {
            out.extend_from_slice(body);
        }
    }

    Ok(out)
}

/// `content-type` → `Content-Type`.
fn canonical_name(name: &HeaderName) -> String {
    let mut upper = true;
    name.as_str()
        .chars()
        .map(|c| {
            let c = if upper { c.to_ascii_uppercase() } else { c };
            upper = c == '-';
            c
        })
        .collect()
}

fn trim(value: &[u8]) -> &[u8] {
    let blank = |b: &u8| matches!(b, b' ' | b'\t' | b'\r' | b'\n');
    let start = value.iter().position(|b| !blank(b)).unwrap_or(value.len());
    let end = value.iter().rposition(|b| !blank(b)).map_or(start, |i| i + 1);
    &value[start..end]
}
