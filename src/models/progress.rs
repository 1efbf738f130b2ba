// src/models/progress.rs

use serde::{Deserialize, Serialize};

use crate::models::{certificate::Certificate, gamification::GamificationEntry};

/// DTO for marking a content unit as completed.
#[derive(Debug, Deserialize)]
pub struct MarkCompleteRequest {
    pub course_id: i64,
    pub content_unit_id: i64,
}

/// Aggregate completion state of one learner in one course.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionStatus {
    pub completed_count: i64,
    pub required_count: i64,
    pub is_complete: bool,
}

impl CompletionStatus {
    /// Completion ratio as a percentage, 0 when nothing counts.
    pub fn percent(&self) -> f64 {
        if self.required_count == 0 {
            return 0.0;
        }
        (self.completed_count as f64 / self.required_count as f64) * 100.0
    }
}

/// Outcome of a `mark_complete` call.
#[derive(Debug, Serialize)]
pub struct ProgressUpdate {
    /// `false` when the unit had already been completed (no-op).
    pub inserted: bool,
    #[serde(flatten)]
    pub status: CompletionStatus,
    pub certificate: Option<Certificate>,
    pub gamification: Option<GamificationEntry>,
}

/// Learner-facing summary of a course.
#[derive(Debug, Serialize)]
pub struct ProgressSummary {
    pub course_id: i64,
    pub completed_units: Vec<i64>,
    #[serde(flatten)]
    pub status: CompletionStatus,
    pub percent: f64,
    pub certificate: Option<Certificate>,
    pub gamification: GamificationEntry,
}
