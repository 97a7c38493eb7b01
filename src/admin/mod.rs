//! Admin status API, served on its own listener.

pub mod auth;
pub mod handlers;

use axum::{middleware, routing::get, Router};
use std::sync::Arc;

use crate::buffer::RequestBuffer;
use crate::health::HealthState;
use self::auth::admin_auth_middleware;
use self::handlers::get_status;

/// Shared state for admin handlers.
#[derive(Clone)]
pub struct AdminState {
    pub health: Arc<HealthState>,
    pub buffer: Arc<RequestBuffer>,
    /// Bearer token; empty disables authentication.
    pub api_key: Arc<str>,
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}
