// src/handlers/certificate.rs

use axum::{
    Json,
    extract::{Extension, Path, State},
    response::IntoResponse,
};

use crate::{engine::ProgressEngine, error::AppError, utils::jwt::Claims};

/// Issues the caller's certificate for a course.
///
/// Returns the existing certificate on repeated calls, 400 while the course is
/// still incomplete.
pub async fn issue_certificate(
    State(engine): State<ProgressEngine>,
    Extension(claims): Extension<Claims>,
    Path(course_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let certificate = engine
        .issue_certificate_if_eligible(claims.user_id()?, course_id)
        .await?;
    Ok(Json(certificate))
}

pub async fn list_my_certificates(
    State(engine): State<ProgressEngine>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let certificates = engine.certificates_of(claims.user_id()?).await?;
    Ok(Json(certificates))
}

/// Public lookup used to verify a certificate someone presents.
pub async fn verify_certificate(
    State(engine): State<ProgressEngine>,
    Path(certificate_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let certificate = engine.verify_certificate(&certificate_id).await?;
    Ok(Json(certificate))
}
