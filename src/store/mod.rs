// src/store/mod.rs

//! Persistence seam for the progress engine.
//!
//! Every mutation that guards an invariant is expressed as a single atomic
//! operation ("insert if absent", "increment by n", unique insert) so that
//! concurrent requests for the same (user, course) never lose updates.

use std::fmt;

use async_trait::async_trait;

use crate::models::{
    certificate::Certificate,
    course::{ContentUnit, Course},
    gamification::GamificationEntry,
    quiz::{Quiz, QuizQuestion, QuizRecord},
    user::User,
};

pub mod cache;
pub mod memory;
pub mod postgres;

pub use cache::CachedStore;
pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    Conflict(String),
    /// A numeric column would leave its range (e.g. XP past `i64::MAX`).
    OutOfRange(String),
    Database(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Conflict(msg) => write!(f, "conflict: {}", msg),
            StoreError::OutOfRange(msg) => write!(f, "out of range: {}", msg),
            StoreError::Database(msg) => write!(f, "database error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::Conflict(db.message().to_string())
            }
            // 22003: numeric_value_out_of_range
            sqlx::Error::Database(db) if db.code().as_deref() == Some("22003") => {
                StoreError::OutOfRange(db.message().to_string())
            }
            _ => StoreError::Database(err.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewCourse {
    pub owner_id: i64,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Default)]
pub struct CoursePatch {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewContentUnit {
    pub title: String,
    pub video_url: Option<String>,
    /// `None` appends after the current last unit.
    pub position: Option<i32>,
    pub required: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ContentUnitPatch {
    pub title: Option<String>,
    pub video_url: Option<String>,
    pub position: Option<i32>,
    pub required: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct NewQuiz {
    pub content_unit_id: Option<i64>,
    pub title: String,
    pub questions: Vec<QuizQuestion>,
    pub passing_score: f64,
    pub time_limit: Option<i32>,
}

/// Result of recording a graded attempt.
#[derive(Debug, Clone)]
pub struct QuizAttemptOutcome {
    pub record: QuizRecord,
    /// `true` only for the attempt that first passed the quiz.
    pub first_pass: bool,
    /// Ledger entry after the pass reward, committed together with `passed_at`.
    pub gamification: Option<GamificationEntry>,
}

/// Result of recording a completed content unit.
#[derive(Debug, Clone)]
pub struct UnitCompletion {
    /// `false` when the unit was already completed; nothing was awarded then.
    pub inserted: bool,
    /// Ledger entry after the lesson reward, committed together with the progress row.
    pub gamification: Option<GamificationEntry>,
}

#[async_trait]
pub trait Store: Send + Sync {
    // ----- Users -----

    /// Fails with `StoreError::Conflict` when the username is taken.
    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        role: &str,
    ) -> Result<User, StoreError>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    // ----- Courses -----

    async fn create_course(&self, new: NewCourse) -> Result<Course, StoreError>;

    async fn update_course(&self, id: i64, patch: CoursePatch)
    -> Result<Option<Course>, StoreError>;

    /// Removes the course and everything owned by it. Returns `false` if absent.
    async fn delete_course(&self, id: i64) -> Result<bool, StoreError>;

    async fn get_course(&self, id: i64) -> Result<Option<Course>, StoreError>;

    async fn list_courses(&self) -> Result<Vec<Course>, StoreError>;

    async fn add_content_unit(
        &self,
        course_id: i64,
        new: NewContentUnit,
    ) -> Result<ContentUnit, StoreError>;

    async fn update_content_unit(
        &self,
        course_id: i64,
        unit_id: i64,
        patch: ContentUnitPatch,
    ) -> Result<Option<ContentUnit>, StoreError>;

    /// Units of a course ordered by position.
    async fn list_content_units(&self, course_id: i64) -> Result<Vec<ContentUnit>, StoreError>;

    // ----- Quizzes -----

    async fn create_quiz(&self, course_id: i64, new: NewQuiz) -> Result<Quiz, StoreError>;

    async fn get_quiz(&self, id: i64) -> Result<Option<Quiz>, StoreError>;

    async fn list_quizzes(&self, course_id: i64) -> Result<Vec<Quiz>, StoreError>;

    /// Keeps the best score, counts attempts and stamps the first pass.
    ///
    /// The first pass also credits `pass_xp` in the quiz's course, atomically
    /// with the stamp. Nothing is written when the credit fails.
    async fn record_quiz_attempt(
        &self,
        user_id: i64,
        quiz_id: i64,
        score: f64,
        passed: bool,
        pass_xp: i64,
    ) -> Result<QuizAttemptOutcome, StoreError>;

    // ----- Progress ledger -----

    /// Inserts the progress entry unless it already exists and, when it was
    /// added, credits `xp_award` in the same atomic step.
    async fn complete_unit(
        &self,
        user_id: i64,
        course_id: i64,
        content_unit_id: i64,
        xp_award: i64,
    ) -> Result<UnitCompletion, StoreError>;

    async fn completed_unit_ids(&self, user_id: i64, course_id: i64)
    -> Result<Vec<i64>, StoreError>;

    // ----- Certificates -----

    async fn find_certificate(
        &self,
        user_id: i64,
        course_id: i64,
    ) -> Result<Option<Certificate>, StoreError>;

    async fn find_certificate_by_id(
        &self,
        certificate_id: &str,
    ) -> Result<Option<Certificate>, StoreError>;

    async fn list_certificates(&self, user_id: i64) -> Result<Vec<Certificate>, StoreError>;

    /// Fails with `StoreError::Conflict` if (user, course) already holds one.
    async fn insert_certificate(&self, certificate: &Certificate) -> Result<(), StoreError>;

    // ----- Gamification ledger -----

    async fn get_gamification(
        &self,
        user_id: i64,
        course_id: i64,
    ) -> Result<Option<GamificationEntry>, StoreError>;

    /// Atomically adds `amount` to the entry, creating it at zero first.
    /// Fails with `StoreError::OutOfRange` instead of overflowing.
    async fn increment_xp(
        &self,
        user_id: i64,
        course_id: i64,
        amount: i64,
    ) -> Result<GamificationEntry, StoreError>;

    /// Adds badges to the unlocked set. Already unlocked names are ignored.
    async fn unlock_badges(
        &self,
        user_id: i64,
        course_id: i64,
        badges: &[String],
    ) -> Result<GamificationEntry, StoreError>;
}
