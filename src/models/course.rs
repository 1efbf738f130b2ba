// src/models/course.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use url::Url;
use validator::Validate;

use crate::models::quiz::PublicQuiz;

/// Represents the 'courses' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Course {
    pub id: i64,

    pub name: String,

    /// Sanitized HTML description.
    pub description: String,

    /// Admin user who created the course.
    pub owner_id: i64,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Represents the 'content_units' table: a single lesson or video of a course.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ContentUnit {
    pub id: i64,
    pub course_id: i64,
    pub title: String,
    pub video_url: Option<String>,

    /// Ordering position inside the course (ascending).
    pub position: i32,

    /// Whether the unit counts toward course completion.
    pub required: bool,
}

/// Course with its ordered units and quizzes, answer keys stripped.
#[derive(Debug, Serialize)]
pub struct CourseDetail {
    #[serde(flatten)]
    pub course: Course,
    pub content_units: Vec<ContentUnit>,
    pub quizzes: Vec<PublicQuiz>,
}

/// DTO for creating a new course.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCourseRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 20000))]
    #[serde(default)]
    pub description: String,
}

/// DTO for updating a course. Fields are optional.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateCourseRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 20000))]
    pub description: Option<String>,
}

/// DTO for adding a content unit to a course.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateContentUnitRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 500), custom(function = validate_url_string))]
    pub video_url: Option<String>,
    /// Appended after the last unit when absent.
    #[validate(range(min = 0))]
    pub position: Option<i32>,
    #[serde(default = "default_required")]
    pub required: bool,
}

/// DTO for editing a content unit. Existing progress against it is kept.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateContentUnitRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 500), custom(function = validate_url_string))]
    pub video_url: Option<String>,
    #[validate(range(min = 0))]
    pub position: Option<i32>,
    pub required: Option<bool>,
}

fn default_required() -> bool {
    true
}

/// Validates that a string is a correctly formatted URL.
fn validate_url_string(url: &str) -> Result<(), validator::ValidationError> {
    if Url::parse(url).is_err() {
        return Err(validator::ValidationError::new("invalid_url"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_unit_rejects_bad_video_url() {
        let req = CreateContentUnitRequest {
            title: "Intro".to_string(),
            video_url: Some("not a url".to_string()),
            position: None,
            required: true,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn content_unit_defaults_to_required() {
        let req: CreateContentUnitRequest =
            serde_json::from_value(serde_json::json!({ "title": "Intro" })).unwrap();
        assert!(req.required);
        assert!(req.validate().is_ok());
    }
}
