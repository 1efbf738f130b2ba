// src/handlers/course.rs

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};

use crate::{
    engine::ProgressEngine,
    error::AppError,
    models::{course::CourseDetail, quiz::PublicQuiz},
};

/// Lists all courses.
pub async fn list_courses(
    State(engine): State<ProgressEngine>,
) -> Result<impl IntoResponse, AppError> {
    let courses = engine.store().list_courses().await?;
    Ok(Json(courses))
}

/// Gets a course with its ordered units and its quizzes (answer keys stripped).
pub async fn get_course(
    State(engine): State<ProgressEngine>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let course = engine.require_course(id).await?;
    let content_units = engine.store().list_content_units(id).await?;
    let quizzes = engine
        .store()
        .list_quizzes(id)
        .await?
        .into_iter()
        .map(PublicQuiz::from)
        .collect();

    Ok(Json(CourseDetail {
        course,
        content_units,
        quizzes,
    }))
}
