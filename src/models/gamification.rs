// src/models/gamification.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Experience points and unlocked badges of one learner in one course.
///
/// Stored across the 'gamification_entries' (xp) and 'badge_unlocks' tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GamificationEntry {
    pub user_id: i64,
    pub course_id: i64,
    pub xp: i64,
    /// Badge names in unlock order.
    pub badges: Vec<String>,
}

impl GamificationEntry {
    pub fn empty(user_id: i64, course_id: i64) -> Self {
        Self {
            user_id,
            course_id,
            ..Self::default()
        }
    }

    pub fn has_badge(&self, badge: &str) -> bool {
        self.badges.iter().any(|b| b == badge)
    }
}

/// DTO for crediting XP.
#[derive(Debug, Deserialize, Validate)]
pub struct AddXpRequest {
    pub course_id: i64,
    #[validate(range(
        min = 1,
        max = 1_000_000,
        message = "XP amount must be between 1 and 1000000."
    ))]
    pub xp: i64,
}

/// Result of an XP credit, including badges unlocked by this call.
#[derive(Debug, Serialize)]
pub struct XpAward {
    #[serde(flatten)]
    pub entry: GamificationEntry,
    pub new_badges: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xp_request_is_bounded() {
        for (xp, ok) in [(0, false), (1, true), (1_000_000, true), (1_000_001, false), (i64::MAX, false)] {
            let req = AddXpRequest { course_id: 1, xp };
            assert_eq!(req.validate().is_ok(), ok, "xp = {}", xp);
        }
    }
}
