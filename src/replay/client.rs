//! Rebuilding snapshots into outbound requests.

use axum::http::StatusCode;
use std::time::{Duration, Instant};
use thiserror::Error;
use url::Url;

use crate::buffer::BufferedRequest;
use crate::net::build_client;
use crate::observability::metrics;

/// Why a replay did not count as delivered.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("request has no Host and no upstream is configured")]
    MissingHost,

    #[error("invalid target URL {url}: {source}")]
    InvalidTarget {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("backend unreachable: {0}")]
    Unreachable(#[from] reqwest::Error),

    #[error("backend answered {0}")]
    Rejected(StatusCode),
}

impl ReplayError {
    /// Whether another attempt could succeed. Requests whose target cannot
    /// be built never will.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ReplayError::Unreachable(_) | ReplayError::Rejected(_))
    }

    fn outcome(&self) -> &'static str {
        match self {
            ReplayError::MissingHost | ReplayError::InvalidTarget { .. } => "invalid",
            ReplayError::Unreachable(_) => "unreachable",
            ReplayError::Rejected(_) => "rejected",
        }
    }
}

/// Sends snapshots to the backend.
#[derive(Debug, Clone)]
pub struct Replayer {
    client: reqwest::Client,
    upstream: Option<Url>,
}

impl Replayer {
    /// `upstream`, when given, overrides scheme and authority of every
    /// replay; the original `Host` header is still sent.
    pub fn new(timeout: Duration, upstream: Option<Url>) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_client(timeout)?,
            upstream,
        })
    }

    pub fn upstream(&self) -> Option<&Url> {
        self.upstream.as_ref()
    }

    /// Replay one snapshot. Any status below 300 is a delivery; the response
    /// body is discarded.
    pub async fn replay(&self, request: &BufferedRequest) -> Result<StatusCode, ReplayError> {
        let started = Instant::now();
        let result = self.send(request).await;

        match &result {
            Ok(_) => metrics::record_replay("delivered", started),
            Err(e) => metrics::record_replay(e.outcome(), started),
        }
        result
    }

    /// Send a freshly captured request straight through. Same classification
    /// as [`Replayer::replay`], but nothing is recorded under the replay
    /// metrics.
    pub async fn forward(&self, request: &BufferedRequest) -> Result<StatusCode, ReplayError> {
        self.send(request).await
    }

    async fn send(&self, request: &BufferedRequest) -> Result<StatusCode, ReplayError> {
        let url = target_url(request, self.upstream.as_ref())?;

        let response = self
            .client
            .request(request.method.clone(), url)
            .headers(request.headers.clone())
            .body(request.body.clone())
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() < 300 {
            Ok(status)
        } else {
            Err(ReplayError::Rejected(status))
        }
    }
}

/// Where a snapshot is sent: the snapshot's scheme and original host, or the
/// configured upstream's scheme and authority (plus any path prefix).
pub fn target_url(request: &BufferedRequest, upstream: Option<&Url>) -> Result<Url, ReplayError> {
    let raw = match upstream {
        Some(base) => {
            let authority = match (base.host_str(), base.port()) {
                (Some(host), Some(port)) => format!("{host}:{port}"),
                (Some(host), None) => host.to_string(),
                (None, _) => return Err(ReplayError::MissingHost),
            };
            let prefix = base.path().trim_end_matches('/');
            format!("{}://{}{}{}", base.scheme(), authority, prefix, request.path_and_query)
        }
        None => {
            let host = request.host.as_deref().ok_or(ReplayError::MissingHost)?;
            format!("{}://{}{}", request.scheme.as_str(), host, request.path_and_query)
        }
    };

    Url::parse(&raw).map_err(|source| ReplayError::InvalidTarget { url: raw, source })
}
