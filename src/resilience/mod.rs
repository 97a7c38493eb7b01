//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Background loop tick (health probe, replay flush, status line):
//!     → guard.rs (catch panic, log, continue)
//!
//! Inbound request:
//!     → tower-http CatchPanicLayer (answer 500, keep serving)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every outbound call has a deadline
//! - A fault in one iteration never ends the owning loop

pub mod guard;

pub use guard::{guarded, run_ticks};
