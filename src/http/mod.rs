//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, any method/path)
//!     → request.rs (capture: read body, strip hop-by-hop, recover scheme)
//!     → ingest.rs (queue, or forward when healthy under that policy)
//!     → response.rs (204 No Content)
//! ```

pub mod ingest;
pub mod request;
pub mod response;
pub mod server;

pub use ingest::{Accepted, IngestError, IngestionGateway};
pub use request::{capture, CaptureError, CaptureOptions};
pub use server::{HttpServer, ServerError};
