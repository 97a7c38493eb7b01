//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! status.rs:
//!     periodic status line (queue depth, backend up/down and for how long)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Prometheus scrape endpoint (optional)
//!     → admin /admin/status (optional)
//! ```

pub mod logging;
pub mod metrics;
pub mod status;

pub use status::{StatusReporter, StatusSummary};
