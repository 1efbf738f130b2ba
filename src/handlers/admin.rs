// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    engine::ProgressEngine,
    error::AppError,
    models::{
        course::{
            CreateContentUnitRequest, CreateCourseRequest, UpdateContentUnitRequest,
            UpdateCourseRequest,
        },
        quiz::CreateQuizRequest,
    },
    store::{ContentUnitPatch, CoursePatch, NewContentUnit, NewCourse, NewQuiz},
    utils::{html::clean_html, jwt::Claims},
};

/// Creates a course owned by the calling admin.
pub async fn create_course(
    State(engine): State<ProgressEngine>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateCourseRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let course = engine
        .store()
        .create_course(NewCourse {
            owner_id: claims.user_id()?,
            name: payload.name,
            description: clean_html(&payload.description),
        })
        .await?;

    tracing::info!(course_id = course.id, "Course created");

    Ok((StatusCode::CREATED, Json(course)))
}

pub async fn update_course(
    State(engine): State<ProgressEngine>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateCourseRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let patch = CoursePatch {
        name: payload.name,
        description: payload.description.as_deref().map(clean_html),
    };

    let course = engine
        .store()
        .update_course(id, patch)
        .await?
        .ok_or(AppError::CourseNotFound(id))?;

    Ok(Json(course))
}

/// Deletes a course together with its units, quizzes and learner records.
pub async fn delete_course(
    State(engine): State<ProgressEngine>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if !engine.store().delete_course(id).await? {
        return Err(AppError::CourseNotFound(id));
    }

    tracing::info!(course_id = id, "Course deleted");

    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_content_unit(
    State(engine): State<ProgressEngine>,
    Path(course_id): Path<i64>,
    Json(payload): Json<CreateContentUnitRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    engine.require_course(course_id).await?;

    let unit = engine
        .store()
        .add_content_unit(
            course_id,
            NewContentUnit {
                title: payload.title,
                video_url: payload.video_url,
                position: payload.position,
                required: payload.required,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(unit)))
}

/// Edits a content unit. Progress already recorded against it is kept.
pub async fn update_content_unit(
    State(engine): State<ProgressEngine>,
    Path((course_id, unit_id)): Path<(i64, i64)>,
    Json(payload): Json<UpdateContentUnitRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    engine.require_course(course_id).await?;

    let patch = ContentUnitPatch {
        title: payload.title,
        video_url: payload.video_url,
        position: payload.position,
        required: payload.required,
    };

    let unit = engine
        .store()
        .update_content_unit(course_id, unit_id, patch)
        .await?
        .ok_or(AppError::ContentUnitNotFound(unit_id))?;

    Ok(Json(unit))
}

pub async fn create_quiz(
    State(engine): State<ProgressEngine>,
    Path(course_id): Path<i64>,
    Json(payload): Json<CreateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    engine.require_course(course_id).await?;

    // The attached unit must belong to the same course.
    if let Some(unit_id) = payload.content_unit_id {
        engine.require_unit(course_id, unit_id).await?;
    }

    let quiz = engine
        .store()
        .create_quiz(
            course_id,
            NewQuiz {
                content_unit_id: payload.content_unit_id,
                title: payload.title,
                questions: payload.questions,
                passing_score: payload.passing_score,
                time_limit: payload.time_limit,
            },
        )
        .await?;

    tracing::info!(course_id, quiz_id = quiz.id, "Quiz created");

    Ok((StatusCode::CREATED, Json(quiz)))
}
