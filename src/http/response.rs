//! Responses returned to inbound callers.
//!
//! Acceptance is always `204 No Content`, whatever the backend later says.
//! The only error statuses come from the relay itself.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::http::ingest::{Accepted, IngestError};
use crate::http::request::CaptureError;

impl IntoResponse for Accepted {
    fn into_response(self) -> Response {
        StatusCode::NO_CONTENT.into_response()
    }
}

impl IntoResponse for CaptureError {
    fn into_response(self) -> Response {
        let status = match &self {
            CaptureError::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            CaptureError::Body(_) | CaptureError::MissingHost => StatusCode::BAD_REQUEST,
        };
        (status, self.to_string()).into_response()
    }
}

impl IntoResponse for IngestError {
    fn into_response(self) -> Response {
        (StatusCode::SERVICE_UNAVAILABLE, self.to_string()).into_response()
    }
}
