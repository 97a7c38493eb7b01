//! Replay subsystem.
//!
//! # Data Flow
//! ```text
//! dispatcher.rs (fixed tick, gated by HealthState)
//!     → RequestBuffer::try_dequeue_up_to(burst)
//!     → client.rs (rebuild URL, send with timeout)
//!     → delivered / requeued
//! ```

pub mod client;
pub mod dispatcher;

pub use client::{target_url, ReplayError, Replayer};
pub use dispatcher::{Deliver, FlushReport, ReplayDispatcher};
