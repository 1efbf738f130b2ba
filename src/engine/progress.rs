// src/engine/progress.rs

use crate::{
    engine::ProgressEngine,
    error::AppError,
    models::{
        gamification::GamificationEntry,
        progress::{CompletionStatus, ProgressSummary, ProgressUpdate},
    },
};

impl ProgressEngine {
    /// Records that `user_id` completed a content unit.
    ///
    /// Repeated calls for the same unit are no-ops (`inserted == false`) and
    /// award nothing. Lesson XP is committed together with the progress row.
    /// Once the course is complete every call makes sure the certificate
    /// exists, so a retry after a failed issuance still gets it.
    pub async fn mark_complete(
        &self,
        user_id: i64,
        course_id: i64,
        content_unit_id: i64,
    ) -> Result<ProgressUpdate, AppError> {
        self.require_course(course_id).await?;
        self.require_unit(course_id, content_unit_id).await?;

        let completion = self
            .store
            .complete_unit(
                user_id,
                course_id,
                content_unit_id,
                self.settings.xp_per_lesson,
            )
            .await?;

        let status = self.completion_status(user_id, course_id).await?;

        if completion.inserted {
            tracing::info!(
                user_id,
                course_id,
                content_unit_id,
                completed = status.completed_count,
                required = status.required_count,
                "Content unit completed"
            );
        } else {
            tracing::debug!(
                user_id,
                course_id,
                content_unit_id,
                "Content unit already completed"
            );
        }

        let gamification = match completion.gamification {
            Some(entry) => Some(self.unlock_earned_badges(entry).await?.entry),
            None => None,
        };

        let certificate = if status.is_complete {
            Some(self.issue_certificate_if_eligible(user_id, course_id).await?)
        } else {
            None
        };

        Ok(ProgressUpdate {
            inserted: completion.inserted,
            status,
            certificate,
            gamification,
        })
    }

    /// Completed vs. counted units for a learner, under the configured policy.
    pub async fn completion_status(
        &self,
        user_id: i64,
        course_id: i64,
    ) -> Result<CompletionStatus, AppError> {
        self.require_course(course_id).await?;
        let units = self.store.list_content_units(course_id).await?;
        let completed = self.store.completed_unit_ids(user_id, course_id).await?;
        Ok(self.settings.completion_policy.evaluate(&units, &completed))
    }

    pub async fn completed_count(&self, user_id: i64, course_id: i64) -> Result<i64, AppError> {
        Ok(self.completion_status(user_id, course_id).await?.completed_count)
    }

    pub async fn required_count(&self, course_id: i64) -> Result<i64, AppError> {
        self.require_course(course_id).await?;
        let units = self.store.list_content_units(course_id).await?;
        let policy = self.settings.completion_policy;
        Ok(units.iter().filter(|u| policy.counts(u)).count() as i64)
    }

    pub async fn is_complete(&self, user_id: i64, course_id: i64) -> Result<bool, AppError> {
        Ok(self.completion_status(user_id, course_id).await?.is_complete)
    }

    /// Everything the learner dashboard shows for one course.
    pub async fn progress_summary(
        &self,
        user_id: i64,
        course_id: i64,
    ) -> Result<ProgressSummary, AppError> {
        self.require_course(course_id).await?;
        let units = self.store.list_content_units(course_id).await?;
        let completed_units = self.store.completed_unit_ids(user_id, course_id).await?;
        let status = self
            .settings
            .completion_policy
            .evaluate(&units, &completed_units);

        let certificate = self.store.find_certificate(user_id, course_id).await?;
        let gamification = self
            .store
            .get_gamification(user_id, course_id)
            .await?
            .unwrap_or_else(|| GamificationEntry::empty(user_id, course_id));

        Ok(ProgressSummary {
            course_id,
            completed_units,
            percent: status.percent(),
            status,
            certificate,
            gamification,
        })
    }
}
