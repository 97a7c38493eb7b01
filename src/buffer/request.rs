//! Replayable request snapshot.

use axum::body::Bytes;
use axum::http::{HeaderMap, Method};
use std::time::Instant;
use uuid::Uuid;

/// Scheme the request originally arrived with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scheme {
    #[default]
    Http,
    Https,
}

impl Scheme {
    /// `Https` if the inbound connection was encrypted.
    pub fn from_tls(encrypted: bool) -> Self {
        if encrypted {
            Scheme::Https
        } else {
            Scheme::Http
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

/// A fully materialized copy of an inbound request.
///
/// Holds no reference to the original connection: the body is owned bytes
/// and no inbound deadline is carried, so the snapshot can sit in the buffer
/// indefinitely and be replayed any number of times.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferedRequest {
    /// Correlation ID for logs; never sent upstream.
    pub id: Uuid,
    pub method: Method,
    /// Value of the original `Host` header (or URI authority).
    pub host: Option<String>,
    pub path_and_query: String,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub scheme: Scheme,
    pub captured_at: Instant,
}

impl BufferedRequest {
    pub fn new(
        method: Method,
        host: Option<String>,
        path_and_query: impl Into<String>,
        headers: HeaderMap,
        body: Bytes,
        scheme: Scheme,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            method,
            host,
            path_and_query: path_and_query.into(),
            headers,
            body,
            scheme,
            captured_at: Instant::now(),
        }
    }

    /// Time since capture.
    pub fn age(&self) -> std::time::Duration {
        self.captured_at.elapsed()
    }
}
