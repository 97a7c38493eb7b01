//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and that addresses
//! and URLs parse. All errors are collected, not just the first.

use std::net::SocketAddr;
use thiserror::Error;
use url::Url;

use crate::config::schema::RelayConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("{field} is not a valid socket address: {value}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field} is not a valid http(s) URL: {value}")]
    InvalidUrl { field: &'static str, value: String },

    #[error("listener.tls.{field} must not be empty")]
    MissingTlsPath { field: &'static str },
}

/// Validate a configuration, returning every problem found.
pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if let Some(tls) = &config.listener.tls {
        if tls.cert_path.is_empty() {
            errors.push(ValidationError::MissingTlsPath { field: "cert_path" });
        }
        if tls.key_path.is_empty() {
            errors.push(ValidationError::MissingTlsPath { field: "key_path" });
        }
    }

    check_positive(&mut errors, "buffer.capacity", config.buffer.capacity as u64);

    check_url(&mut errors, "health_check.url", &config.health_check.url);
    check_positive(&mut errors, "health_check.interval_ms", config.health_check.interval_ms);
    check_positive(&mut errors, "health_check.timeout_ms", config.health_check.timeout_ms);

    check_positive(&mut errors, "replay.flush_interval_ms", config.replay.flush_interval_ms);
    check_positive(&mut errors, "replay.burst", config.replay.burst as u64);
    check_positive(&mut errors, "replay.timeout_ms", config.replay.timeout_ms);
    if let Some(upstream) = &config.replay.upstream {
        check_url(&mut errors, "replay.upstream", upstream);
    }

    check_positive(&mut errors, "ingest.max_body_size", config.ingest.max_body_size as u64);

    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }
    if config.admin.enabled {
        check_address(&mut errors, "admin.bind_address", &config.admin.bind_address);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_positive(errors: &mut Vec<ValidationError>, field: &'static str, value: u64) {
    if value == 0 {
        errors.push(ValidationError::Zero { field });
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

fn check_url(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    let valid = Url::parse(value)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
        .unwrap_or(false);
    if !valid {
        errors.push(ValidationError::InvalidUrl {
            field,
            value: value.to_string(),
        });
    }
}
