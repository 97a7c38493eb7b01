use axum::{extract::State, Json};

use crate::admin::AdminState;
use crate::observability::StatusSummary;

pub async fn get_status(State(state): State<AdminState>) -> Json<StatusSummary> {
    Json(StatusSummary::collect(&state.health, &state.buffer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admin::setup_admin_router;
    use crate::buffer::RequestBuffer;
    use crate::config::OverflowPolicy;
    use crate::health::HealthState;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn state(api_key: &str) -> AdminState {
        AdminState {
            health: Arc::new(HealthState::new()),
            buffer: Arc::new(RequestBuffer::new(5, OverflowPolicy::Block)),
            api_key: Arc::from(api_key),
        }
    }

    fn status_request(token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri("/admin/status");
        if let Some(t) = token {
            builder = builder.header("authorization", format!("Bearer {t}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_status_reports_buffer_and_backend() {
        let app = setup_admin_router(state(""));
        let res = app.oneshot(status_request(None)).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let body = axum::body::to_bytes(res.into_body(), 64 * 1024).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["backend"], "unknown");
        assert_eq!(json["capacity"], 5);
        assert_eq!(json["queue_depth"], 0);
    }

    #[tokio::test]
    async fn test_bearer_token_required_when_configured() {
        let app = setup_admin_router(state("secret"));

        let res = app.clone().oneshot(status_request(None)).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let res = app.clone().oneshot(status_request(Some("wrong"))).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let res = app.oneshot(status_request(Some("secret"))).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }
}
