//! Ingestion gateway: from captured snapshot to buffer (or backend).
//!
//! The inbound caller is acknowledged as soon as the snapshot is queued or
//! forwarded; it never learns what the backend eventually answered. Under the
//! `block` overflow policy a full buffer holds the caller until a slot frees.

use std::sync::Arc;
use thiserror::Error;

use crate::buffer::{BufferError, BufferedRequest, RequestBuffer};
use crate::config::IngestPolicy;
use crate::health::HealthState;
use crate::observability::metrics;
use crate::replay::Replayer;

/// How an accepted request was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accepted {
    Queued,
    Forwarded,
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("request buffer is full")]
    BufferFull,

    #[error("relay is shutting down")]
    ShuttingDown,
}

#[derive(Debug, Clone)]
pub struct IngestionGateway {
    buffer: Arc<RequestBuffer>,
    health: Arc<HealthState>,
    replayer: Replayer,
    policy: IngestPolicy,
}

impl IngestionGateway {
    pub fn new(
        buffer: Arc<RequestBuffer>,
        health: Arc<HealthState>,
        replayer: Replayer,
        policy: IngestPolicy,
    ) -> Self {
        Self {
            buffer,
            health,
            replayer,
            policy,
        }
    }

    pub fn policy(&self) -> IngestPolicy {
        self.policy
    }

    /// Accept one snapshot according to the ingest policy.
    pub async fn accept(&self, request: BufferedRequest) -> Result<Accepted, IngestError> {
        if self.policy == IngestPolicy::ForwardWhenHealthy && !self.health.is_down() {
            match self.replayer.forward(&request).await {
                Ok(status) => {
                    tracing::debug!(
                        id = %request.id,
                        status = status.as_u16(),
                        "Forwarded request directly"
                    );
                    metrics::record_ingested("forwarded");
                    return Ok(Accepted::Forwarded);
                }
                Err(e) => {
                    tracing::warn!(
                        id = %request.id,
                        error = %e,
                        "Direct forward failed, buffering request"
                    );
                }
            }
        }

        self.enqueue(request).await
    }

    async fn enqueue(&self, request: BufferedRequest) -> Result<Accepted, IngestError> {
        let id = request.id;
        match self.buffer.enqueue(request).await {
            Ok(evicted) => {
                for victim in &evicted {
                    tracing::warn!(
                        id = %victim.id,
                        method = %victim.method,
                        path = %victim.path_and_query,
                        "Buffer full, evicted oldest request"
                    );
                }
                tracing::debug!(id = %id, queued = self.buffer.len(), "Request buffered");
                metrics::record_ingested("queued");
                Ok(Accepted::Queued)
            }
            Err(BufferError::Full(rejected)) => {
                tracing::warn!(
                    id = %rejected.id,
                    capacity = self.buffer.capacity(),
                    "Buffer full, rejecting request"
                );
                metrics::record_ingested("rejected");
                Err(IngestError::BufferFull)
            }
            Err(BufferError::Closed(rejected)) => {
                tracing::info!(id = %rejected.id, "Buffer closed, rejecting request");
                metrics::record_ingested("rejected");
                Err(IngestError::ShuttingDown)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::Scheme;
    use crate::config::OverflowPolicy;
    use axum::body::Bytes;
    use axum::http::{HeaderMap, Method};
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::time::{Duration, Instant};
    use url::Url;

    fn req() -> BufferedRequest {
        BufferedRequest::new(
            Method::POST,
            Some("backend.test".into()),
            "/e",
            HeaderMap::new(),
            Bytes::from_static(b"payload"),
            Scheme::Http,
        )
    }

    fn gateway(policy: IngestPolicy, capacity: usize, overflow: OverflowPolicy) -> IngestionGateway {
        // nothing listens on port 9 of the loopback; forwards fail fast
        let upstream = Url::parse("http://127.0.0.1:9").unwrap();
        IngestionGateway::new(
            Arc::new(RequestBuffer::new(capacity, overflow)),
            Arc::new(HealthState::new()),
            Replayer::new(Duration::from_millis(200), Some(upstream)).unwrap(),
            policy,
        )
    }

    #[tokio::test]
    async fn test_buffer_always_queues_even_when_healthy() {
        let gw = gateway(IngestPolicy::BufferAlways, 4, OverflowPolicy::Block);
        gw.health.transition_to(false, Instant::now());

        assert_eq!(gw.accept(req()).await.unwrap(), Accepted::Queued);
        assert_eq!(gw.buffer.len(), 1);
    }

    #[tokio::test]
    async fn test_forward_policy_queues_while_down() {
        let gw = gateway(IngestPolicy::ForwardWhenHealthy, 4, OverflowPolicy::Block);
        assert_eq!(gw.accept(req()).await.unwrap(), Accepted::Queued);
        assert_eq!(gw.buffer.len(), 1);
    }

    #[tokio::test]
    async fn test_forward_failure_falls_back_to_buffer() {
        let gw = gateway(IngestPolicy::ForwardWhenHealthy, 4, OverflowPolicy::Block);
        gw.health.transition_to(false, Instant::now());

        let original = req();
        assert_eq!(gw.accept(original.clone()).await.unwrap(), Accepted::Queued);
        let claims = gw.buffer.try_dequeue_up_to(1);
        assert_eq!(claims[0].request(), &original);
    }

    #[tokio::test]
    async fn test_reject_policy_surfaces_full_buffer() {
        let gw = gateway(IngestPolicy::BufferAlways, 1, OverflowPolicy::Reject);
        gw.accept(req()).await.unwrap();
        assert!(matches!(gw.accept(req()).await, Err(IngestError::BufferFull)));
    }

    #[tokio::test]
    async fn test_closed_buffer_reports_shutdown() {
        let gw = gateway(IngestPolicy::BufferAlways, 1, OverflowPolicy::Block);
        gw.buffer.close();
        assert!(matches!(gw.accept(req()).await, Err(IngestError::ShuttingDown)));
    }

    #[test]
    fn test_direct_forward_stays_out_of_replay_metrics() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        let accepted = ::metrics::with_local_recorder(&recorder, || {
            runtime.block_on(async {
                let gw = gateway(IngestPolicy::ForwardWhenHealthy, 4, OverflowPolicy::Block);
                gw.health.transition_to(false, Instant::now());
                gw.accept(req()).await
            })
        });
        assert_eq!(accepted.unwrap(), Accepted::Queued);

        let rendered = handle.render();
        assert!(rendered.contains(r#"httpbuf_requests_ingested_total{outcome="queued"} 1"#));
        assert!(!rendered.contains("httpbuf_replays_total"));
        assert!(!rendered.contains("httpbuf_replay_duration_seconds"));
    }
}
