//! Periodic replay of buffered requests.
//!
//! # Per tick
//! ```text
//! backend down?            → idle, items keep accumulating
//! n = min(len, burst) == 0 → idle
//! dequeue n claims, then one at a time:
//!     status < 300         → drop claim (delivered)
//!     status ≥ 300 / error → requeue at tail, unchanged
//! ```
//!
//! Replays inside a burst are strictly sequential. The burst limit and the
//! tick interval together bound the load put on a backend that has only just
//! recovered.

use axum::http::StatusCode;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::buffer::{BufferedRequest, RequestBuffer};
use crate::config::ReplayConfig;
use crate::health::HealthState;
use crate::replay::client::{ReplayError, Replayer};
use crate::resilience::{guarded, run_ticks};

/// Sends one buffered request to the backend.
pub trait Deliver: Send + Sync {
    fn deliver(
        &self,
        request: &BufferedRequest,
    ) -> impl Future<Output = Result<StatusCode, ReplayError>> + Send;
}

impl Deliver for Replayer {
    fn deliver(
        &self,
        request: &BufferedRequest,
    ) -> impl Future<Output = Result<StatusCode, ReplayError>> + Send {
        self.replay(request)
    }
}

/// Outcome counts of one flush cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FlushReport {
    pub attempted: usize,
    pub delivered: usize,
    pub requeued: usize,
    pub discarded: usize,
}

pub struct ReplayDispatcher<D = Replayer> {
    health: Arc<HealthState>,
    buffer: Arc<RequestBuffer>,
    replayer: D,
    interval: Duration,
    burst: usize,
}

impl<D: Deliver> ReplayDispatcher<D> {
    pub fn new(
        health: Arc<HealthState>,
        buffer: Arc<RequestBuffer>,
        replayer: D,
        config: &ReplayConfig,
    ) -> Self {
        Self {
            health,
            buffer,
            replayer,
            interval: config.flush_interval(),
            burst: config.burst,
        }
    }

    /// Flush every interval until shutdown. The first flush happens one
    /// interval after start.
    pub async fn run(self, shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval_ms = self.interval.as_millis() as u64,
            burst = self.burst,
            "Replay dispatcher starting"
        );

        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let this = &self;
        run_ticks("replay-dispatcher", ticker, shutdown, move || this.flush()).await;
        tracing::info!(
            remaining = self.buffer.len(),
            "Replay dispatcher received shutdown signal, exiting loop"
        );
    }

    /// Run one flush cycle.
    pub async fn flush(&self) -> FlushReport {
        let mut report = FlushReport::default();

        let health = self.health.read();
        if health.is_down() {
            tracing::debug!(
                queued = self.buffer.len(),
                status = %health.status,
                "Backend down, holding buffered requests"
            );
            return report;
        }

        let n = self.buffer.len().min(self.burst);
        if n == 0 {
            return report;
        }

        for claim in self.buffer.try_dequeue_up_to(n) {
            report.attempted += 1;
            let request = claim.request();

            // a panicking delivery must not take the rest of the burst with it
            let outcome = guarded("replay", self.replayer.deliver(request)).await;
            match outcome {
                Some(Ok(status)) => {
                    tracing::info!(
                        id = %request.id,
                        method = %request.method,
                        path = %request.path_and_query,
                        status = status.as_u16(),
                        age_ms = request.age().as_millis() as u64,
                        "Replayed request"
                    );
                    report.delivered += 1;
                }
                Some(Err(e)) if e.is_retryable() => {
                    tracing::warn!(
                        id = %request.id,
                        method = %request.method,
                        path = %request.path_and_query,
                        error = %e,
                        "Replay failed, requeueing"
                    );
                    self.buffer.requeue(claim);
                    report.requeued += 1;
                }
                Some(Err(e)) => {
                    tracing::error!(
                        id = %request.id,
                        method = %request.method,
                        path = %request.path_and_query,
                        error = %e,
                        "Replay impossible, discarding request"
                    );
                    report.discarded += 1;
                }
                None => {
                    tracing::warn!(id = %request.id, "Replay panicked, requeueing");
                    self.buffer.requeue(claim);
                    report.requeued += 1;
                }
            }
        }

        tracing::debug!(
            attempted = report.attempted,
            delivered = report.delivered,
            requeued = report.requeued,
            remaining = self.buffer.len(),
            "Flush cycle complete"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::Scheme;
    use crate::config::OverflowPolicy;
    use axum::body::Bytes;
    use axum::http::{HeaderMap, Method};

    /// Delivers everything except `/boom`, which panics.
    struct PanicsOnBoom;

    impl Deliver for PanicsOnBoom {
        fn deliver(
            &self,
            request: &BufferedRequest,
        ) -> impl Future<Output = Result<StatusCode, ReplayError>> + Send {
            let boom = request.path_and_query == "/boom";
            async move {
                if boom {
                    panic!("delivery blew up");
                }
                Ok(StatusCode::OK)
            }
        }
    }

    fn req(path: &str) -> BufferedRequest {
        BufferedRequest::new(
            Method::POST,
            Some("backend.test".into()),
            path,
            HeaderMap::new(),
            Bytes::from_static(b"x"),
            Scheme::Http,
        )
    }

    #[tokio::test]
    async fn test_panicking_delivery_keeps_rest_of_burst() {
        let health = Arc::new(HealthState::new());
        health.transition_to(false, std::time::Instant::now());
        let buffer = Arc::new(RequestBuffer::new(8, OverflowPolicy::Block));
        for path in ["/a", "/boom", "/c"] {
            buffer.enqueue(req(path)).await.unwrap();
        }

        let config = ReplayConfig {
            burst: 3,
            ..Default::default()
        };
        let dispatcher = ReplayDispatcher::new(health, buffer.clone(), PanicsOnBoom, &config);

        let report = dispatcher.flush().await;
        assert_eq!(report.attempted, 3);
        assert_eq!(report.delivered, 2);
        assert_eq!(report.requeued, 1);

        let left = buffer.try_dequeue_up_to(8);
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].request().path_and_query, "/boom");
    }
}
