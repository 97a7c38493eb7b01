//! HTTP server setup and wiring.
//!
//! # Responsibilities
//! - Build the shared health state, buffer and replayer
//! - Create the Axum router that ingests every method and path
//! - Spawn the health monitor, replay dispatcher and status reporter
//! - Serve plain HTTP or TLS until shutdown

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use url::Url;

use crate::admin::{setup_admin_router, AdminState};
use crate::buffer::{RequestBuffer, Scheme};
use crate::config::RelayConfig;
use crate::health::{HealthMonitor, HealthState};
use crate::http::ingest::IngestionGateway;
use crate::http::request::{capture, CaptureOptions};
use crate::net::tls::{load_tls_config, TlsError};
use crate::observability::StatusReporter;
use crate::replay::{ReplayDispatcher, Replayer};

const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("invalid upstream URL: {0}")]
    Upstream(#[from] url::ParseError),

    #[error(transparent)]
    Tls(#[from] TlsError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Application state injected into the ingest handler.
#[derive(Clone)]
pub struct AppState {
    pub gateway: IngestionGateway,
    pub capture: CaptureOptions,
}

/// The buffering relay server.
pub struct HttpServer {
    config: RelayConfig,
    health: Arc<HealthState>,
    buffer: Arc<RequestBuffer>,
    replayer: Replayer,
}

impl HttpServer {
    /// Create a new server with the given (validated) configuration.
    pub fn new(config: RelayConfig) -> Result<Self, ServerError> {
        let upstream = config
            .replay
            .upstream
            .as_deref()
            .map(Url::parse)
            .transpose()?;
        let replayer = Replayer::new(config.replay.timeout(), upstream)?;

        let health = Arc::new(HealthState::new());
        let buffer = Arc::new(RequestBuffer::new(
            config.buffer.capacity,
            config.buffer.overflow,
        ));

        Ok(Self {
            config,
            health,
            buffer,
            replayer,
        })
    }

    pub fn health(&self) -> Arc<HealthState> {
        self.health.clone()
    }

    pub fn buffer(&self) -> Arc<RequestBuffer> {
        self.buffer.clone()
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Ingest router. Every method and path is accepted.
    pub fn router(&self) -> Router {
        with_fault_layers(self.ingest_routes())
    }

    fn ingest_routes(&self) -> Router {
        let scheme = Scheme::from_tls(self.config.listener.tls.is_some());
        let state = AppState {
            gateway: IngestionGateway::new(
                self.buffer.clone(),
                self.health.clone(),
                self.replayer.clone(),
                self.config.ingest.policy,
            ),
            capture: CaptureOptions {
                scheme,
                max_body_size: self.config.ingest.max_body_size,
                require_host: self.replayer.upstream().is_none(),
            },
        };

        Router::new()
            .route("/{*path}", any(ingest_handler))
            .route("/", any(ingest_handler))
            .with_state(state)
    }

    /// Run the server until `shutdown` fires.
    ///
    /// The buffer is closed as soon as the signal arrives, before the drain
    /// starts: handlers waiting for a slot answer 503 instead of holding the
    /// drain open forever.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            tls = self.config.listener.tls.is_some(),
            capacity = self.buffer.capacity(),
            overflow = ?self.config.buffer.overflow,
            policy = ?self.config.ingest.policy,
            "HTTP server starting"
        );

        let monitor = HealthMonitor::new(self.health.clone(), &self.config.health_check)?;
        tokio::spawn(monitor.run(shutdown.resubscribe()));

        let dispatcher = ReplayDispatcher::new(
            self.health.clone(),
            self.buffer.clone(),
            self.replayer.clone(),
            &self.config.replay,
        );
        tokio::spawn(dispatcher.run(shutdown.resubscribe()));

        if self.config.observability.status_interval_ms > 0 {
            let reporter = StatusReporter::new(
                self.health.clone(),
                self.buffer.clone(),
                Duration::from_millis(self.config.observability.status_interval_ms),
            );
            tokio::spawn(reporter.run(shutdown.resubscribe()));
        }

        if self.config.admin.enabled {
            self.spawn_admin(shutdown.resubscribe()).await?;
        }

        let app = self.router();

        match &self.config.listener.tls {
            Some(tls) => {
                let rustls = load_tls_config(tls).await?;
                let handle = axum_server::Handle::new();
                let drain = handle.clone();
                let buffer = self.buffer.clone();
                tokio::spawn(async move {
                    let _ = shutdown.recv().await;
                    buffer.close();
                    drain.graceful_shutdown(Some(DRAIN_TIMEOUT));
                });

                axum_server::from_tcp_rustls(listener.into_std()?, rustls)
                    .handle(handle)
                    .serve(app.into_make_service())
                    .await?;
            }
            None => {
                let buffer = self.buffer.clone();
                axum::serve(listener, app)
                    .with_graceful_shutdown(async move {
                        let _ = shutdown.recv().await;
                        buffer.close();
                    })
                    .await?;
            }
        }

        tracing::info!(dropped = self.buffer.len(), "HTTP server stopped");
        Ok(())
    }

    async fn spawn_admin(&self, mut shutdown: broadcast::Receiver<()>) -> Result<(), ServerError> {
        let listener = TcpListener::bind(&self.config.admin.bind_address).await?;
        tracing::info!(address = %listener.local_addr()?, "Admin API listening");

        let app = setup_admin_router(AdminState {
            health: self.health.clone(),
            buffer: self.buffer.clone(),
            api_key: Arc::from(self.config.admin.api_key.as_str()),
        });

        tokio::spawn(async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown.recv().await;
                })
                .await;
            if let Err(e) = served {
                tracing::error!(error = %e, "Admin API failed");
            }
        });
        Ok(())
    }
}

/// A panicking handler answers 500; the server keeps serving.
fn with_fault_layers(routes: Router) -> Router {
    routes
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
}

/// Capture the inbound request and hand it to the gateway.
async fn ingest_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let snapshot = match capture(request, state.capture).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            tracing::warn!(error = %e, "Rejected inbound request");
            return e.into_response();
        }
    };

    tracing::debug!(
        id = %snapshot.id,
        method = %snapshot.method,
        path = %snapshot.path_and_query,
        bytes = snapshot.body.len(),
        "Captured request"
    );

    match state.gateway.accept(snapshot).await {
        Ok(accepted) => accepted.into_response(),
        Err(e) => e.into_response(),
    }
}
