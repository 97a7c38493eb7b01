//! Periodic status line.
//!
//! Every interval one log line reports queue depth and how long the backend
//! has been up or down, e.g. `queue_depth=42 backend="down" duration=3m12s`.
//! The same summary backs the admin `/admin/status` endpoint.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{self, MissedTickBehavior};

use crate::buffer::RequestBuffer;
use crate::health::HealthState;
use crate::observability::metrics;
use crate::resilience::run_ticks;

/// Point-in-time view of the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusSummary {
    pub version: &'static str,
    pub backend: &'static str,
    /// Seconds spent in the current up/down state.
    pub since_secs: u64,
    pub queue_depth: usize,
    pub capacity: usize,
    pub available_slots: usize,
}

impl StatusSummary {
    pub fn collect(health: &HealthState, buffer: &RequestBuffer) -> Self {
        let snap = health.read();
        Self {
            version: env!("CARGO_PKG_VERSION"),
            backend: snap.status.as_str(),
            since_secs: snap.elapsed().as_secs(),
            queue_depth: buffer.len(),
            capacity: buffer.capacity(),
            available_slots: buffer.available_slots(),
        }
    }
}

pub struct StatusReporter {
    health: Arc<HealthState>,
    buffer: Arc<RequestBuffer>,
    interval: Duration,
}

impl StatusReporter {
    pub fn new(health: Arc<HealthState>, buffer: Arc<RequestBuffer>, interval: Duration) -> Self {
        Self {
            health,
            buffer,
            interval,
        }
    }

    pub async fn run(self, shutdown: broadcast::Receiver<()>) {
        let mut ticker = time::interval_at(time::Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let this = &self;
        run_ticks("status-reporter", ticker, shutdown, move || async move {
            this.report();
        })
        .await;
    }

    /// Log one status line and return what was logged.
    pub fn report(&self) -> StatusSummary {
        let summary = StatusSummary::collect(&self.health, &self.buffer);
        let duration = format_duration(Duration::from_secs(summary.since_secs));

        tracing::info!(
            queue_depth = summary.queue_depth,
            capacity = summary.capacity,
            backend = summary.backend,
            duration = %duration,
            "Status"
        );
        metrics::set_buffer_depth(summary.queue_depth);

        summary
    }
}

/// Compact human-readable duration: `2d3h`, `1h2m3s`, `45s`, `0s`.
pub fn format_duration(d: Duration) -> String {
    let total = d.as_secs();
    let (days, hours, mins, secs) = (
        total / 86_400,
        (total % 86_400) / 3_600,
        (total % 3_600) / 60,
        total % 60,
    );

    if days > 0 {
        return if hours > 0 {
            format!("{days}d{hours}h")
        } else {
            format!("{days}d")
        };
    }

    let mut out = String::new();
    if hours > 0 {
        out.push_str(&format!("{hours}h"));
    }
    if mins > 0 {
        out.push_str(&format!("{mins}m"));
    }
    if secs > 0 || out.is_empty() {
        out.push_str(&format!("{secs}s"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OverflowPolicy;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(0)), "0s");
        assert_eq!(format_duration(Duration::from_secs(45)), "45s");
        assert_eq!(format_duration(Duration::from_secs(120)), "2m");
        assert_eq!(format_duration(Duration::from_secs(3_723)), "1h2m3s");
        assert_eq!(format_duration(Duration::from_secs(3_600)), "1h");
        assert_eq!(format_duration(Duration::from_secs(2 * 86_400 + 3 * 3_600 + 59)), "2d3h");
        assert_eq!(format_duration(Duration::from_secs(86_400)), "1d");
    }

    #[test]
    fn test_summary_reflects_shared_state() {
        let health = Arc::new(HealthState::new());
        let buffer = Arc::new(RequestBuffer::new(8, OverflowPolicy::Block));
        let reporter = StatusReporter::new(health.clone(), buffer, Duration::from_secs(1));

        let summary = reporter.report();
        assert_eq!(summary.backend, "unknown");
        assert_eq!(summary.queue_depth, 0);
        assert_eq!(summary.capacity, 8);
        assert_eq!(summary.available_slots, 8);

        health.transition_to(false, std::time::Instant::now());
        assert_eq!(reporter.report().backend, "up");
    }
}
