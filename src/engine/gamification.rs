// src/engine/gamification.rs

use crate::{
    engine::ProgressEngine,
    error::AppError,
    models::gamification::{GamificationEntry, XpAward},
    notify::Notification,
};

impl ProgressEngine {
    /// Credits `amount` XP to a learner in a course and unlocks every badge
    /// whose threshold is now reached. Badges are never removed.
    pub async fn add_xp(
        &self,
        user_id: i64,
        course_id: i64,
        amount: i64,
    ) -> Result<XpAward, AppError> {
        if amount <= 0 {
            return Err(AppError::BadRequest("XP amount must be positive".to_string()));
        }
        self.require_course(course_id).await?;

        let entry = self.store.increment_xp(user_id, course_id, amount).await?;
        self.unlock_earned_badges(entry).await
    }

    /// Unlocks the badges `entry.xp` qualifies for but does not hold yet.
    ///
    /// Badges follow from XP alone, so a badge missed here (failed write) is
    /// picked up by the next credit in the same course.
    pub(crate) async fn unlock_earned_badges(
        &self,
        entry: GamificationEntry,
    ) -> Result<XpAward, AppError> {
        let new_badges = self
            .settings
            .badge_tiers
            .newly_unlocked(entry.xp, &entry.badges);

        if new_badges.is_empty() {
            return Ok(XpAward { entry, new_badges });
        }

        let (user_id, course_id) = (entry.user_id, entry.course_id);
        let entry = self
            .store
            .unlock_badges(user_id, course_id, &new_badges)
            .await?;

        for badge in &new_badges {
            tracing::info!(user_id, course_id, badge = %badge, xp = entry.xp, "Badge unlocked");
            self.notify(Notification::BadgeUnlocked {
                user_id,
                course_id,
                badge: badge.clone(),
            });
        }

        Ok(XpAward { entry, new_badges })
    }

    /// The learner's XP and badges in a course; zero XP when nothing was earned.
    pub async fn gamification(
        &self,
        user_id: i64,
        course_id: i64,
    ) -> Result<GamificationEntry, AppError> {
        self.require_course(course_id).await?;
        Ok(self
            .store
            .get_gamification(user_id, course_id)
            .await?
            .unwrap_or_else(|| GamificationEntry::empty(user_id, course_id)))
    }
}
