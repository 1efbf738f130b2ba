// src/models/certificate.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'certificates' table in the database.
/// At most one row exists per (user, course); rows are never updated.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Certificate {
    pub certificate_id: String,
    pub user_id: i64,
    pub course_id: i64,
    pub issued_at: chrono::DateTime<chrono::Utc>,
}

impl Certificate {
    /// Builds a certificate with a fresh random identifier.
    pub fn new(user_id: i64, course_id: i64) -> Self {
        Self {
            certificate_id: uuid::Uuid::new_v4().to_string(),
            user_id,
            course_id,
            issued_at: chrono::Utc::now(),
        }
    }
}
