// src/models/quiz.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

/// A single multiple-choice question with its answer key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub prompt: String,

    /// List of options (e.g., ["Option A", "Option B"]).
    pub options: Vec<String>,

    /// Index into `options` of the correct answer.
    pub correct_option: usize,

    /// Explanation shown after grading.
    #[serde(default)]
    pub explanation: Option<String>,
}

/// Represents the 'quizzes' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Quiz {
    pub id: i64,
    pub course_id: i64,

    /// Lesson the quiz belongs to. Passing the quiz completes that lesson.
    pub content_unit_id: Option<i64>,

    pub title: String,

    /// Ordered questions, stored as a JSON array in the database.
    pub questions: Json<Vec<QuizQuestion>>,

    /// Minimum score percentage (0-100) required to pass.
    pub passing_score: f64,

    /// Optional time limit in minutes. Enforced by the client.
    pub time_limit: Option<i32>,
}

/// Question sent to learners (excludes the answer key and explanation).
#[derive(Debug, Serialize)]
pub struct PublicQuestion {
    pub prompt: String,
    pub options: Vec<String>,
}

/// Quiz sent to learners.
#[derive(Debug, Serialize)]
pub struct PublicQuiz {
    pub id: i64,
    pub content_unit_id: Option<i64>,
    pub title: String,
    pub questions: Vec<PublicQuestion>,
    pub passing_score: f64,
    pub time_limit: Option<i32>,
}

impl From<Quiz> for PublicQuiz {
    fn from(quiz: Quiz) -> Self {
        Self {
            id: quiz.id,
            content_unit_id: quiz.content_unit_id,
            title: quiz.title,
            questions: quiz
                .questions
                .0
                .into_iter()
                .map(|q| PublicQuestion {
                    prompt: q.prompt,
                    options: q.options,
                })
                .collect(),
            passing_score: quiz.passing_score,
            time_limit: quiz.time_limit,
        }
    }
}

/// DTO for creating a new quiz.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuizRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub content_unit_id: Option<i64>,
    #[validate(custom(function = validate_questions))]
    pub questions: Vec<QuizQuestion>,
    #[validate(range(min = 0.0, max = 100.0))]
    pub passing_score: f64,
    #[validate(range(min = 1))]
    pub time_limit: Option<i32>,
}

fn validate_questions(questions: &[QuizQuestion]) -> Result<(), validator::ValidationError> {
    for q in questions {
        if q.prompt.is_empty() || q.prompt.len() > 1000 {
            return Err(validator::ValidationError::new("invalid_prompt"));
        }
        if q.options.is_empty() {
            return Err(validator::ValidationError::new("options_cannot_be_empty"));
        }
        if q.options.iter().any(|opt| opt.len() > 500) {
            return Err(validator::ValidationError::new("option_too_long"));
        }
        if q.correct_option >= q.options.len() {
            return Err(validator::ValidationError::new("answer_key_out_of_range"));
        }
    }
    Ok(())
}

/// DTO for submitting a quiz attempt.
///
/// One entry per question, in order. `null` marks an unanswered question.
#[derive(Debug, Deserialize)]
pub struct SubmitQuizRequest {
    #[serde(default)]
    pub answers: Vec<Option<usize>>,
}

/// Represents the 'quiz_records' table: a learner's history on one quiz.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuizRecord {
    pub user_id: i64,
    pub quiz_id: i64,
    pub best_score: f64,
    pub attempts: i32,
    pub passed_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(options: usize, correct: usize) -> QuizQuestion {
        QuizQuestion {
            prompt: "Pick one".to_string(),
            options: (0..options).map(|i| format!("Option {}", i)).collect(),
            correct_option: correct,
            explanation: None,
        }
    }

    #[test]
    fn answer_key_must_point_at_an_option() {
        let req = CreateQuizRequest {
            title: "Quiz".to_string(),
            content_unit_id: None,
            questions: vec![question(2, 2)],
            passing_score: 60.0,
            time_limit: None,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn passing_score_is_a_percentage() {
        let req = CreateQuizRequest {
            title: "Quiz".to_string(),
            content_unit_id: None,
            questions: vec![question(4, 1)],
            passing_score: 120.0,
            time_limit: Some(10),
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn public_quiz_hides_answer_key() {
        let quiz = Quiz {
            id: 7,
            course_id: 1,
            content_unit_id: None,
            title: "Quiz".to_string(),
            questions: Json(vec![question(3, 1)]),
            passing_score: 50.0,
            time_limit: None,
        };
        let value = serde_json::to_value(PublicQuiz::from(quiz)).unwrap();
        assert!(value["questions"][0].get("correct_option").is_none());
        assert_eq!(value["questions"][0]["options"].as_array().unwrap().len(), 3);
    }
}
