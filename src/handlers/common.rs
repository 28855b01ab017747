use axum::{http::StatusCode, Json};
use serde::Serialize;
use uuid::Uuid;

use crate::{errors::ServiceError, ApiResponse};

/// Standard success response
pub fn success_response<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse::success(data))
}

/// Success response carrying a human-readable message
pub fn message_response<T: Serialize>(data: T, message: &str) -> Json<ApiResponse<T>> {
    Json(ApiResponse::success_with_message(data, message))
}

/// Standard created response
pub fn created_response<T: Serialize>(data: T) -> (StatusCode, Json<ApiResponse<T>>) {
    (StatusCode::CREATED, Json(ApiResponse::success(data)))
}

/// Parses a path identifier. Malformed ids cannot name anything, so they are
/// reported as missing rather than as bad input.
pub fn parse_id(raw: &str, resource: &str) -> Result<Uuid, ServiceError> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| ServiceError::NotFound(format!("{} not found", resource)))
}
