// src/handlers/quiz.rs

use axum::{
    Json,
    extract::{Extension, Path, State},
    response::IntoResponse,
};

use crate::{
    engine::ProgressEngine,
    error::AppError,
    models::quiz::{PublicQuiz, SubmitQuizRequest},
    utils::jwt::Claims,
};

/// Fetches a quiz for taking (no answer keys).
pub async fn get_quiz(
    State(engine): State<ProgressEngine>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = engine.get_quiz(quiz_id).await?;
    Ok(Json(PublicQuiz::from(quiz)))
}

/// Grades a submission.
///
/// `answers[i]` is the chosen option for question `i`, `null` if skipped.
/// Missing trailing answers count as wrong, extra ones are ignored.
pub async fn submit_quiz(
    State(engine): State<ProgressEngine>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
    Json(payload): Json<SubmitQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    let submission = engine
        .submit_quiz(claims.user_id()?, quiz_id, &payload.answers)
        .await?;
    Ok(Json(submission))
}
