// src/handlers/gamification.rs

use axum::{
    Json,
    extract::{Extension, Path, State},
    response::IntoResponse,
};

use validator::Validate;

use crate::{
    engine::ProgressEngine,
    error::AppError,
    models::gamification::AddXpRequest,
    utils::jwt::Claims,
};

pub async fn add_xp(
    State(engine): State<ProgressEngine>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<AddXpRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let award = engine
        .add_xp(claims.user_id()?, payload.course_id, payload.xp)
        .await?;
    Ok(Json(award))
}

pub async fn get_gamification(
    State(engine): State<ProgressEngine>,
    Extension(claims): Extension<Claims>,
    Path(course_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let entry = engine.gamification(claims.user_id()?, course_id).await?;
    Ok(Json(entry))
}
