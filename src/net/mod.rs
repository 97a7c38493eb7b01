//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound:
//!     TCP connection
//!     → tls.rs (optional TLS handshake via axum-server/rustls)
//!     → Hand off to HTTP layer
//!
//! Outbound:
//!     client.rs (reqwest client with a fixed timeout)
//!     → health probes and replays
//! ```

pub mod client;
pub mod tls;

pub use client::build_client;
