use axum::{extract::{rejection::JsonRejection, State}, response::IntoResponse, Json};

use crate::adapters::http::state::HttpState;
use crate::application::dto::{DebugDetectRequest, DetectRequest};
use crate::domain::errors::DomainError;

fn parse_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, DomainError> {
    body.map(|Json(req)| req)
        .map_err(|e| DomainError::Validation(e.body_text()))
}

pub async fn detect(
    State(st): State<HttpState>,
    body: Result<Json<DetectRequest>, JsonRejection>,
) -> Result<impl IntoResponse, DomainError> {
    let req = parse_body(body)?;
    Ok(Json(st.detection.detect(req).await?))
}

pub async fn detect_debug(
    State(st): State<HttpState>,
    body: Result<Json<DebugDetectRequest>, JsonRejection>,
) -> Result<impl IntoResponse, DomainError> {
    let req = parse_body(body)?;
    Ok(Json(st.detection.detect_debug(req).await?))
}

pub async fn health(State(st): State<HttpState>) -> impl IntoResponse {
    Json(st.detection.health())
}
