// src/engine/mod.rs

//! Course progress & certification engine.
//!
//! Flow for a learner action: the quiz grader scores an attempt, the progress
//! ledger records completed units, the completion evaluator checks the course,
//! the certificate issuer runs once the course is complete and the
//! gamification ledger is credited with XP.

use std::sync::Arc;

use crate::{
    config::Config,
    error::AppError,
    models::course::{ContentUnit, Course},
    notify::{self, Notification, Notifier},
    store::Store,
};

pub mod badges;
pub mod certificate;
pub mod completion;
pub mod gamification;
pub mod grader;
pub mod progress;
pub mod quiz;

use badges::BadgeTiers;
use completion::CompletionPolicy;

/// Tunables of the engine, usually read from `Config`.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub badge_tiers: BadgeTiers,
    pub completion_policy: CompletionPolicy,
    pub xp_per_lesson: i64,
    pub xp_per_quiz_pass: i64,
}

impl From<&Config> for EngineSettings {
    fn from(config: &Config) -> Self {
        Self {
            badge_tiers: config.badge_tiers.clone(),
            completion_policy: config.completion_policy,
            xp_per_lesson: config.xp_per_lesson,
            xp_per_quiz_pass: config.xp_per_quiz_pass,
        }
    }
}

#[derive(Clone)]
pub struct ProgressEngine {
    store: Arc<dyn Store>,
    notifier: Arc<dyn Notifier>,
    settings: EngineSettings,
}

impl ProgressEngine {
    pub fn new(store: Arc<dyn Store>, notifier: Arc<dyn Notifier>, settings: EngineSettings) -> Self {
        Self {
            store,
            notifier,
            settings,
        }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub(crate) async fn require_course(&self, course_id: i64) -> Result<Course, AppError> {
        self.store
            .get_course(course_id)
            .await?
            .ok_or(AppError::CourseNotFound(course_id))
    }

    pub(crate) async fn require_unit(
        &self,
        course_id: i64,
        unit_id: i64,
    ) -> Result<ContentUnit, AppError> {
        self.store
            .list_content_units(course_id)
            .await?
            .into_iter()
            .find(|u| u.id == unit_id)
            .ok_or(AppError::ContentUnitNotFound(unit_id))
    }

    pub(crate) fn notify(&self, notification: Notification) {
        notify::dispatch(self.notifier.clone(), notification);
    }
}
