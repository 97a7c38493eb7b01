//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the buffering relay.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RelayConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Request buffer sizing and overflow behaviour.
    pub buffer: BufferConfig,

    /// Backend health probe settings.
    pub health_check: HealthCheckConfig,

    /// Replay dispatcher settings.
    pub replay: ReplayConfig,

    /// Inbound request handling.
    pub ingest: IngestConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin status API.
    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8100").
    pub bind_address: String,

    /// Optional TLS configuration. Requests arriving over TLS are replayed
    /// with the `https` scheme.
    pub tls: Option<TlsConfig>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8100".to_string(),
            tls: None,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// What to do when a request arrives and the buffer is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Hold the inbound caller until a slot frees up.
    #[default]
    Block,
    /// Refuse the new request.
    Reject,
    /// Evict the oldest queued request to make room.
    DropOldest,
}

/// Request buffer configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BufferConfig {
    /// Maximum number of requests held at once.
    pub capacity: usize,

    /// Behaviour when `capacity` is reached.
    pub overflow: OverflowPolicy,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            capacity: 100_000,
            overflow: OverflowPolicy::Block,
        }
    }
}

/// Health check configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// URL probed with GET; any status below 300 means the backend is up.
    pub url: String,

    /// Probe interval in milliseconds.
    pub interval_ms: u64,

    /// Probe timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8080/status".to_string(),
            interval_ms: 1_000,
            timeout_ms: 3_000,
        }
    }
}

impl HealthCheckConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Replay dispatcher configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// How often buffered requests are flushed, in milliseconds.
    pub flush_interval_ms: u64,

    /// Maximum number of requests replayed per flush.
    pub burst: usize,

    /// Timeout for each replayed request in milliseconds.
    pub timeout_ms: u64,

    /// Optional upstream base URL (e.g. "http://10.0.0.5:8080").
    ///
    /// When unset, requests are replayed to the host named in their
    /// original `Host` header.
    pub upstream: Option<String>,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            flush_interval_ms: 10_000,
            burst: 10,
            timeout_ms: 3_000,
            upstream: None,
        }
    }
}

impl ReplayConfig {
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// How the gateway treats requests while the backend is up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IngestPolicy {
    /// Queue everything; only the dispatcher talks to the backend.
    #[default]
    BufferAlways,
    /// Deliver immediately while healthy, queue when down or on failure.
    ForwardWhenHealthy,
}

/// Inbound request handling.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IngestConfig {
    pub policy: IngestPolicy,

    /// Maximum accepted body size in bytes.
    pub max_body_size: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            policy: IngestPolicy::BufferAlways,
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,

    /// Interval of the periodic status line in milliseconds (0 disables it).
    pub status_interval_ms: u64,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
            status_interval_ms: 10_000,
        }
    }
}

/// Admin status API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token). Empty disables auth.
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: String::new(),
            bind_address: "127.0.0.1:8101".to_string(),
        }
    }
}
