// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

use crate::store::StoreError;

/// User-facing message returned when a certificate is requested too early.
pub const INCOMPLETE_COURSE_MESSAGE: &str = "Complete all modules to get certificate";

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    // 500 Internal Server Error
    InternalServerError(String),

    // 400 Bad Request
    BadRequest(String),

    // 400 Bad Request: certificate requested before every counted unit is done
    IncompleteCourse,

    // 401 Unauthorized
    AuthError(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),
    CourseNotFound(i64),
    ContentUnitNotFound(i64),
    QuizNotFound(i64),

    // 409 Conflict (e.g., duplicate username)
    Conflict(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::IncompleteCourse => f.write_str(INCOMPLETE_COURSE_MESSAGE),
            AppError::CourseNotFound(id) => write!(f, "Course {} not found", id),
            AppError::ContentUnitNotFound(id) => write!(f, "Content unit {} not found", id),
            AppError::QuizNotFound(id) => write!(f, "Quiz {} not found", id),
            other => write!(f, "{:?}", other),
        }
    }
}

impl std::error::Error for AppError {}

/// Implements `IntoResponse` for `AppError`.
/// Converts the error into a JSON response with appropriate HTTP status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::IncompleteCourse => (
                StatusCode::BAD_REQUEST,
                INCOMPLETE_COURSE_MESSAGE.to_string(),
            ),
            AppError::AuthError(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            e @ (AppError::CourseNotFound(_)
            | AppError::ContentUnitNotFound(_)
            | AppError::QuizNotFound(_)) => (StatusCode::NOT_FOUND, e.to_string()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
        };
        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Storage failures surface as 500s, except uniqueness violations (409) and
/// values pushed out of range by the request (400).
impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => AppError::Conflict(msg),
            StoreError::OutOfRange(msg) => AppError::BadRequest(msg),
            StoreError::Database(msg) => AppError::InternalServerError(msg),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incomplete_course_maps_to_bad_request() {
        let response = AppError::IncompleteCourse.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn missing_entities_map_to_not_found() {
        for err in [
            AppError::CourseNotFound(1),
            AppError::ContentUnitNotFound(2),
            AppError::QuizNotFound(3),
        ] {
            assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
        }
    }

    #[test]
    fn store_conflict_becomes_conflict() {
        let err: AppError = StoreError::Conflict("dup".to_string()).into();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[test]
    fn store_out_of_range_becomes_bad_request() {
        let err: AppError = StoreError::OutOfRange("xp".to_string()).into();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
