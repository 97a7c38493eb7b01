//! Inbound TLS.
//!
//! A TLS listener marks every snapshot it captures as `https`, so replays
//! keep the scheme the client originally used.

use axum_server::tls_rustls::RustlsConfig;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::TlsConfig;

#[derive(Debug, Error)]
pub enum TlsError {
    #[error("{kind} file not found: {path}")]
    Missing { kind: &'static str, path: PathBuf },

    #[error("failed to load certificate/key: {0}")]
    Load(#[from] std::io::Error),
}

/// Load the rustls server configuration named by the listener config.
pub async fn load_tls_config(config: &TlsConfig) -> Result<RustlsConfig, TlsError> {
    let cert = Path::new(&config.cert_path);
    let key = Path::new(&config.key_path);

    for (kind, path) in [("certificate", cert), ("private key", key)] {
        if !path.exists() {
            return Err(TlsError::Missing {
                kind,
                path: path.to_path_buf(),
            });
        }
    }

    Ok(RustlsConfig::from_pem_file(cert, key).await?)
}
