// src/handlers/progress.rs

use axum::{
    Json,
    extract::{Extension, Path, State},
    response::IntoResponse,
};

use crate::{
    engine::ProgressEngine,
    error::AppError,
    models::progress::MarkCompleteRequest,
    utils::jwt::Claims,
};

/// Marks a content unit as completed by the caller.
///
/// Idempotent: repeating the call reports `inserted: false` and awards nothing.
pub async fn mark_complete(
    State(engine): State<ProgressEngine>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<MarkCompleteRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let update = engine
        .mark_complete(user_id, payload.course_id, payload.content_unit_id)
        .await?;
    Ok(Json(update))
}

pub async fn get_progress(
    State(engine): State<ProgressEngine>,
    Extension(claims): Extension<Claims>,
    Path(course_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let summary = engine
        .progress_summary(claims.user_id()?, course_id)
        .await?;
    Ok(Json(summary))
}
