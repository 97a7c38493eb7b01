//! Capturing inbound requests as replayable snapshots.
//!
//! # Responsibilities
//! - Read the whole body into memory (bounded)
//! - Strip headers that only make sense on the original connection
//! - Recover the original host and scheme
//!
//! # Design Decisions
//! - Nothing from the inbound connection survives capture, including any
//!   client deadline; a snapshot may be replayed much later
//! - Headers named in `Connection` are stripped along with the standard
//!   hop-by-hop set

use axum::body::{Body, Bytes};
use axum::http::header::{self, HeaderMap, HeaderName};
use axum::http::request::Parts;
use axum::http::Request;
use http_body_util::LengthLimitError;
use thiserror::Error;

use crate::buffer::{BufferedRequest, Scheme};

/// Headers scoped to a single connection, never stored or replayed.
const HOP_BY_HOP: [HeaderName; 7] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    HeaderName::from_static("proxy-connection"),
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("request body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },

    #[error("failed to read request body: {0}")]
    Body(#[source] axum::Error),

    #[error("request has no Host header")]
    MissingHost,
}

/// Options applied while capturing.
#[derive(Debug, Clone, Copy)]
pub struct CaptureOptions {
    /// Scheme of the listener the request arrived on.
    pub scheme: Scheme,
    pub max_body_size: usize,
    /// Refuse requests without a host (nothing to replay them to).
    pub require_host: bool,
}

/// Turn an inbound request into a [`BufferedRequest`].
pub async fn capture(
    request: Request<Body>,
    options: CaptureOptions,
) -> Result<BufferedRequest, CaptureError> {
    let (parts, body) = request.into_parts();

    if declared_length(&parts.headers).is_some_and(|len| len > options.max_body_size) {
        return Err(CaptureError::BodyTooLarge {
            limit: options.max_body_size,
        });
    }

    let host = original_host(&parts);
    if options.require_host && host.is_none() {
        return Err(CaptureError::MissingHost);
    }

    let body = read_body(body, options.max_body_size).await?;
    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/")
        .to_string();

    Ok(BufferedRequest::new(
        parts.method,
        host,
        path_and_query,
        strip_connection_headers(parts.headers),
        body,
        options.scheme,
    ))
}

async fn read_body(body: Body, limit: usize) -> Result<Bytes, CaptureError> {
    axum::body::to_bytes(body, limit).await.map_err(|e| {
        if is_length_limit(&e) {
            CaptureError::BodyTooLarge { limit }
        } else {
            CaptureError::Body(e)
        }
    })
}

fn is_length_limit(err: &axum::Error) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = source {
        if e.is::<LengthLimitError>() {
            return true;
        }
        source = e.source();
    }
    false
}

fn declared_length(headers: &HeaderMap) -> Option<usize> {
    headers
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

/// `Host` header, or the URI authority for HTTP/2 requests.
fn original_host(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .filter(|h| !h.is_empty())
        .map(str::to_string)
        .or_else(|| parts.uri.authority().map(|a| a.as_str().to_string()))
}

/// Remove hop-by-hop headers and any header listed in `Connection`.
pub fn strip_connection_headers(mut headers: HeaderMap) -> HeaderMap {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in HOP_BY_HOP.iter().chain(listed.iter()) {
        headers.remove(name);
    }
    headers
}
