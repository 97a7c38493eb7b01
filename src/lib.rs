//! Transparent request-buffering relay library.

pub mod admin;
pub mod buffer;
pub mod config;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod replay;
pub mod resilience;

pub use config::schema::RelayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
