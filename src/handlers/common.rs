use crate::errors::ServiceError;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Standard success response
pub fn success_response<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(data)).into_response()
}

/// Standard created response
pub fn created_response<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(data)).into_response()
}

/// Parses a numeric path id; anything else is a 400 naming `resource`.
pub fn parse_id(raw: &str, resource: &str) -> Result<i32, ServiceError> {
    raw.trim()
        .parse::<i32>()
        .map_err(|_| ServiceError::ValidationError(format!("Invalid {resource} id '{raw}'")))
}

/// Unwraps a JSON body, turning a missing or malformed body into a 400 so
/// it can be rendered in the route's own envelope.
pub fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ServiceError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| ServiceError::ValidationError(rejection.body_text()))
}
