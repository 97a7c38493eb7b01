//! Active health checking.
//!
//! # Responsibilities
//! - Periodically GET the configured health-check URL
//! - Classify the result (status < 300 → up, anything else → down)
//! - Record the observation in [`HealthState`]

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::config::HealthCheckConfig;
use crate::health::state::{BackendStatus, HealthState};
use crate::net::build_client;
use crate::observability::metrics;
use crate::resilience::run_ticks;

const USER_AGENT: &str = concat!("httpbuf-health-check/", env!("CARGO_PKG_VERSION"));

pub struct HealthMonitor {
    state: Arc<HealthState>,
    url: String,
    interval: Duration,
    client: reqwest::Client,
}

impl HealthMonitor {
    pub fn new(state: Arc<HealthState>, config: &HealthCheckConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            state,
            url: config.url.clone(),
            interval: config.interval(),
            client: build_client(config.timeout())?,
        })
    }

    /// Probe until shutdown. The first probe runs immediately.
    pub async fn run(self, shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval_ms = self.interval.as_millis() as u64,
            url = %self.url,
            "Health monitor starting"
        );

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let this = &self;
        run_ticks("health-monitor", ticker, shutdown, move || this.tick()).await;
        tracing::info!("Health monitor received shutdown signal, exiting loop");
    }

    /// Probe once and record the result. Returns the observed status.
    pub async fn tick(&self) -> BackendStatus {
        let status = self.probe().await;
        let is_down = status.is_down();

        if self.state.transition_to(is_down, Instant::now().into_std()) {
            if is_down {
                tracing::warn!(url = %self.url, "Backend went down; buffering requests");
            } else {
                tracing::info!(url = %self.url, "Backend is up; replay resumes");
            }
        }
        metrics::record_backend_up(!is_down);

        status
    }

    /// Issue one health-check request. Errors are logged, never returned.
    pub async fn probe(&self) -> BackendStatus {
        let result = self
            .client
            .get(&self.url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .send()
            .await;

        match result {
            Ok(response) => {
                let status = response.status();
                if status.as_u16() < 300 {
                    BackendStatus::Up
                } else {
                    tracing::debug!(url = %self.url, status = %status, "Health check failed: non-success status");
                    BackendStatus::Down
                }
            }
            Err(e) if e.is_timeout() => {
                tracing::debug!(url = %self.url, "Health check failed: timeout");
                BackendStatus::Down
            }
            Err(e) => {
                tracing::debug!(url = %self.url, error = %e, "Health check failed: connection error");
                BackendStatus::Down
            }
        }
    }
}
