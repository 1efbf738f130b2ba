// src/engine/quiz.rs

use serde::Serialize;

use crate::{
    engine::{
        ProgressEngine,
        grader::{self, QuizGrade},
    },
    error::AppError,
    models::{
        gamification::XpAward,
        progress::ProgressUpdate,
        quiz::{Quiz, QuizRecord},
    },
};

/// Outcome of a graded quiz submission and its side effects.
#[derive(Debug, Serialize)]
pub struct QuizSubmission {
    pub quiz_id: i64,
    #[serde(flatten)]
    pub grade: QuizGrade,
    pub score_display: f64,
    pub record: QuizRecord,
    /// Present only on the attempt that first passed the quiz.
    pub xp: Option<XpAward>,
    /// Present on the first pass, or when this attempt completed the attached unit.
    pub progress: Option<ProgressUpdate>,
}

impl ProgressEngine {
    pub async fn get_quiz(&self, quiz_id: i64) -> Result<Quiz, AppError> {
        self.store
            .get_quiz(quiz_id)
            .await?
            .ok_or(AppError::QuizNotFound(quiz_id))
    }

    /// Grades an attempt and applies its side effects.
    ///
    /// Every attempt is graded from scratch and recorded (best score kept).
    /// Only the first passing attempt credits quiz XP, committed together with
    /// the pass itself, so retakes cannot farm XP. While the quiz stands
    /// passed, the unit it belongs to is marked complete (idempotent).
    pub async fn submit_quiz(
        &self,
        user_id: i64,
        quiz_id: i64,
        answers: &[Option<usize>],
    ) -> Result<QuizSubmission, AppError> {
        let quiz = self.get_quiz(quiz_id).await?;
        let grade = grader::grade(&quiz, answers);

        let outcome = self
            .store
            .record_quiz_attempt(
                user_id,
                quiz_id,
                grade.score_percent,
                grade.passed,
                self.settings.xp_per_quiz_pass,
            )
            .await?;

        tracing::info!(
            user_id,
            quiz_id,
            score = grade.score_percent,
            passed = grade.passed,
            attempts = outcome.record.attempts,
            "Quiz submitted"
        );

        let xp = match outcome.gamification {
            Some(entry) => Some(self.unlock_earned_badges(entry).await?),
            None => None,
        };

        let mut progress = None;
        if let (Some(unit_id), Some(_)) = (quiz.content_unit_id, outcome.record.passed_at) {
            let update = self.mark_complete(user_id, quiz.course_id, unit_id).await?;
            if outcome.first_pass || update.inserted {
                progress = Some(update);
            }
        }

        Ok(QuizSubmission {
            quiz_id,
            score_display: grade.score_display(),
            grade,
            record: outcome.record,
            xp,
            progress,
        })
    }
}
