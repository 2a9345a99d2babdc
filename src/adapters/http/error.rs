use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use tracing::warn;

use crate::application::dto::ErrorResponse;
use crate::domain::errors::DomainError;

/// Every failure kind leaves the service as a 500 with the same JSON envelope.
impl IntoResponse for DomainError {
    fn into_response(self) -> Response {
        warn!("Request failed ({}): {}", self.kind(), self);
        (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorResponse::from(&self))).into_response()
    }
}
