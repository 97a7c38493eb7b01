//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Active health checks (active.rs):
//!     Periodic timer
//!     → GET health-check URL (bounded timeout)
//!     → Update state.rs on transition
//!
//! State (state.rs):
//!     Unknown → Up ←→ Down
//!     Read by the replay dispatcher, the gateway and the status reporter
//! ```
//!
//! # Design Decisions
//! - One probe decides; there is no hysteresis threshold
//! - Probe failures are never surfaced beyond a state change

pub mod active;
pub mod state;

pub use active::HealthMonitor;
pub use state::{BackendStatus, HealthSnapshot, HealthState};
