//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Init logging/metrics → Bind listener
//!     → HttpServer::run spawns health monitor, dispatcher, status reporter
//!
//! Shutdown (shutdown.rs):
//!     SIGINT/SIGTERM → broadcast → loops exit, server drains
//!     → buffer closed (blocked producers released)
//! ```

pub mod shutdown;

pub use shutdown::Shutdown;
