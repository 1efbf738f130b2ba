// src/store/memory.rs

use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;
use tokio::sync::RwLock;

use crate::{
    models::{
        certificate::Certificate,
        course::{ContentUnit, Course},
        gamification::GamificationEntry,
        quiz::{Quiz, QuizRecord},
        user::User,
    },
    store::{
        ContentUnitPatch, CoursePatch, NewContentUnit, NewCourse, NewQuiz, QuizAttemptOutcome,
        Store, StoreError, UnitCompletion,
    },
};

/// Process-local `Store`. Each check-and-write runs under a single write
/// guard, which gives the same atomicity as the Postgres upserts.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    next_id: i64,
    users: BTreeMap<i64, User>,
    courses: BTreeMap<i64, Course>,
    units: BTreeMap<i64, ContentUnit>,
    quizzes: BTreeMap<i64, Quiz>,
    quiz_records: HashMap<(i64, i64), QuizRecord>,
    /// (user, course) -> completed unit ids, in completion order.
    progress: HashMap<(i64, i64), Vec<i64>>,
    certificates: HashMap<(i64, i64), Certificate>,
    gamification: HashMap<(i64, i64), GamificationEntry>,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    /// Leaves the entry untouched when the sum would overflow.
    fn add_xp(
        &mut self,
        user_id: i64,
        course_id: i64,
        amount: i64,
    ) -> Result<GamificationEntry, StoreError> {
        let entry = self
            .gamification
            .entry((user_id, course_id))
            .or_insert_with(|| GamificationEntry::empty(user_id, course_id));
        entry.xp = entry.xp.checked_add(amount).ok_or_else(|| {
            StoreError::OutOfRange(format!(
                "xp for user {} in course {} would overflow",
                user_id, course_id
            ))
        })?;
        Ok(entry.clone())
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        role: &str,
    ) -> Result<User, StoreError> {
        let mut state = self.state.write().await;
        if state.users.values().any(|u| u.username == username) {
            return Err(StoreError::Conflict(format!(
                "username '{}' already exists",
                username
            )));
        }

        let user = User {
            id: state.next_id(),
            username: username.to_string(),
            password: password_hash.to_string(),
            role: role.to_string(),
            created_at: Utc::now(),
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let state = self.state.read().await;
        Ok(state.users.values().find(|u| u.username == username).cloned())
    }

    async fn create_course(&self, new: NewCourse) -> Result<Course, StoreError> {
        let mut state = self.state.write().await;
        let course = Course {
            id: state.next_id(),
            name: new.name,
            description: new.description,
            owner_id: new.owner_id,
            created_at: Utc::now(),
        };
        state.courses.insert(course.id, course.clone());
        Ok(course)
    }

    async fn update_course(
        &self,
        id: i64,
        patch: CoursePatch,
    ) -> Result<Option<Course>, StoreError> {
        let mut state = self.state.write().await;
        let Some(course) = state.courses.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = patch.name {
            course.name = name;
        }
        if let Some(description) = patch.description {
            course.description = description;
        }
        Ok(Some(course.clone()))
    }

    async fn delete_course(&self, id: i64) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;
        if state.courses.remove(&id).is_none() {
            return Ok(false);
        }

        state.units.retain(|_, u| u.course_id != id);
        let removed_quizzes: HashSet<i64> = state
            .quizzes
            .values()
            .filter(|q| q.course_id == id)
            .map(|q| q.id)
            .collect();
        state.quizzes.retain(|qid, _| !removed_quizzes.contains(qid));
        state
            .quiz_records
            .retain(|(_, qid), _| !removed_quizzes.contains(qid));
        state.progress.retain(|(_, cid), _| *cid != id);
        state.certificates.retain(|(_, cid), _| *cid != id);
        state.gamification.retain(|(_, cid), _| *cid != id);
        Ok(true)
    }

    async fn get_course(&self, id: i64) -> Result<Option<Course>, StoreError> {
        Ok(self.state.read().await.courses.get(&id).cloned())
    }

    async fn list_courses(&self) -> Result<Vec<Course>, StoreError> {
        let state = self.state.read().await;
        let mut courses: Vec<Course> = state.courses.values().cloned().collect();
        courses.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(courses)
    }

    async fn add_content_unit(
        &self,
        course_id: i64,
        new: NewContentUnit,
    ) -> Result<ContentUnit, StoreError> {
        let mut state = self.state.write().await;
        let position = match new.position {
            Some(p) => p,
            None => state
                .units
                .values()
                .filter(|u| u.course_id == course_id)
                .map(|u| u.position + 1)
                .max()
                .unwrap_or(0),
        };
        let unit = ContentUnit {
            id: state.next_id(),
            course_id,
            title: new.title,
            video_url: new.video_url,
            position,
            required: new.required,
        };
        state.units.insert(unit.id, unit.clone());
        Ok(unit)
    }

    async fn update_content_unit(
        &self,
        course_id: i64,
        unit_id: i64,
        patch: ContentUnitPatch,
    ) -> Result<Option<ContentUnit>, StoreError> {
        let mut state = self.state.write().await;
        let Some(unit) = state
            .units
            .get_mut(&unit_id)
            .filter(|u| u.course_id == course_id)
        else {
            return Ok(None);
        };
        if let Some(title) = patch.title {
            unit.title = title;
        }
        if let Some(video_url) = patch.video_url {
            unit.video_url = Some(video_url);
        }
        if let Some(position) = patch.position {
            unit.position = position;
        }
        if let Some(required) = patch.required {
            unit.required = required;
        }
        Ok(Some(unit.clone()))
    }

    async fn list_content_units(&self, course_id: i64) -> Result<Vec<ContentUnit>, StoreError> {
        let state = self.state.read().await;
        let mut units: Vec<ContentUnit> = state
            .units
            .values()
            .filter(|u| u.course_id == course_id)
            .cloned()
            .collect();
        units.sort_by_key(|u| (u.position, u.id));
        Ok(units)
    }

    async fn create_quiz(&self, course_id: i64, new: NewQuiz) -> Result<Quiz, StoreError> {
        let mut state = self.state.write().await;
        let quiz = Quiz {
            id: state.next_id(),
            course_id,
            content_unit_id: new.content_unit_id,
            title: new.title,
            questions: Json(new.questions),
            passing_score: new.passing_score,
            time_limit: new.time_limit,
        };
        state.quizzes.insert(quiz.id, quiz.clone());
        Ok(quiz)
    }

    async fn get_quiz(&self, id: i64) -> Result<Option<Quiz>, StoreError> {
        Ok(self.state.read().await.quizzes.get(&id).cloned())
    }

    async fn list_quizzes(&self, course_id: i64) -> Result<Vec<Quiz>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .quizzes
            .values()
            .filter(|q| q.course_id == course_id)
            .cloned()
            .collect())
    }

    async fn record_quiz_attempt(
        &self,
        user_id: i64,
        quiz_id: i64,
        score: f64,
        passed: bool,
        pass_xp: i64,
    ) -> Result<QuizAttemptOutcome, StoreError> {
        let mut state = self.state.write().await;
        let key = (user_id, quiz_id);

        let first_pass = passed
            && state
                .quiz_records
                .get(&key)
                .is_none_or(|r| r.passed_at.is_none());

        // Credit before touching the record so a failed credit leaves no trace.
        let gamification = if first_pass && pass_xp > 0 {
            let course_id = state
                .quizzes
                .get(&quiz_id)
                .map(|q| q.course_id)
                .ok_or_else(|| StoreError::Database(format!("quiz {} not found", quiz_id)))?;
            Some(state.add_xp(user_id, course_id, pass_xp)?)
        } else {
            None
        };

        let record = state.quiz_records.entry(key).or_insert_with(|| QuizRecord {
            user_id,
            quiz_id,
            best_score: score,
            attempts: 0,
            passed_at: None,
        });

        record.attempts += 1;
        record.best_score = record.best_score.max(score);
        if first_pass {
            record.passed_at = Some(Utc::now());
        }

        Ok(QuizAttemptOutcome {
            record: record.clone(),
            first_pass,
            gamification,
        })
    }

    async fn complete_unit(
        &self,
        user_id: i64,
        course_id: i64,
        content_unit_id: i64,
        xp_award: i64,
    ) -> Result<UnitCompletion, StoreError> {
        let mut state = self.state.write().await;
        let key = (user_id, course_id);

        if state
            .progress
            .get(&key)
            .is_some_and(|done| done.contains(&content_unit_id))
        {
            return Ok(UnitCompletion {
                inserted: false,
                gamification: None,
            });
        }

        let gamification = if xp_award > 0 {
            Some(state.add_xp(user_id, course_id, xp_award)?)
        } else {
            None
        };
        state.progress.entry(key).or_default().push(content_unit_id);

        Ok(UnitCompletion {
            inserted: true,
            gamification,
        })
    }

    async fn completed_unit_ids(
        &self,
        user_id: i64,
        course_id: i64,
    ) -> Result<Vec<i64>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .progress
            .get(&(user_id, course_id))
            .cloned()
            .unwrap_or_default())
    }

    async fn find_certificate(
        &self,
        user_id: i64,
        course_id: i64,
    ) -> Result<Option<Certificate>, StoreError> {
        let state = self.state.read().await;
        Ok(state.certificates.get(&(user_id, course_id)).cloned())
    }

    async fn find_certificate_by_id(
        &self,
        certificate_id: &str,
    ) -> Result<Option<Certificate>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .certificates
            .values()
            .find(|c| c.certificate_id == certificate_id)
            .cloned())
    }

    async fn list_certificates(&self, user_id: i64) -> Result<Vec<Certificate>, StoreError> {
        let state = self.state.read().await;
        let mut certificates: Vec<Certificate> = state
            .certificates
            .values()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        certificates.sort_by(|a, b| b.issued_at.cmp(&a.issued_at));
        Ok(certificates)
    }

    async fn insert_certificate(&self, certificate: &Certificate) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let key = (certificate.user_id, certificate.course_id);
        if state.certificates.contains_key(&key) {
            return Err(StoreError::Conflict(format!(
                "certificate already issued for user {} in course {}",
                key.0, key.1
            )));
        }
        state.certificates.insert(key, certificate.clone());
        Ok(())
    }

    async fn get_gamification(
        &self,
        user_id: i64,
        course_id: i64,
    ) -> Result<Option<GamificationEntry>, StoreError> {
        let state = self.state.read().await;
        Ok(state.gamification.get(&(user_id, course_id)).cloned())
    }

    async fn increment_xp(
        &self,
        user_id: i64,
        course_id: i64,
        amount: i64,
    ) -> Result<GamificationEntry, StoreError> {
        self.state.write().await.add_xp(user_id, course_id, amount)
    }

    async fn unlock_badges(
        &self,
        user_id: i64,
        course_id: i64,
        badges: &[String],
    ) -> Result<GamificationEntry, StoreError> {
        let mut state = self.state.write().await;
        let entry = state
            .gamification
            .entry((user_id, course_id))
            .or_insert_with(|| GamificationEntry::empty(user_id, course_id));
        for badge in badges {
            if !entry.has_badge(badge) {
                entry.badges.push(badge.clone());
            }
        }
        Ok(entry.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unit_completion_is_idempotent_and_awards_once() {
        let store = MemoryStore::new();
        let first = store.complete_unit(1, 2, 3, 10).await.unwrap();
        assert!(first.inserted);
        assert_eq!(first.gamification.map(|g| g.xp), Some(10));

        let again = store.complete_unit(1, 2, 3, 10).await.unwrap();
        assert!(!again.inserted);
        assert!(again.gamification.is_none());

        assert_eq!(store.completed_unit_ids(1, 2).await.unwrap(), vec![3]);
        assert_eq!(store.get_gamification(1, 2).await.unwrap().unwrap().xp, 10);
    }

    #[tokio::test]
    async fn xp_overflow_is_rejected_without_side_effects() {
        let store = MemoryStore::new();
        store.increment_xp(1, 2, i64::MAX).await.unwrap();

        let err = store.increment_xp(1, 2, 1).await.unwrap_err();
        assert!(matches!(err, StoreError::OutOfRange(_)));

        // The progress row is not written when its reward cannot be credited.
        let err = store.complete_unit(1, 2, 3, 10).await.unwrap_err();
        assert!(matches!(err, StoreError::OutOfRange(_)));
        assert!(store.completed_unit_ids(1, 2).await.unwrap().is_empty());
        assert_eq!(store.get_gamification(1, 2).await.unwrap().unwrap().xp, i64::MAX);
    }

    #[tokio::test]
    async fn second_certificate_for_same_course_conflicts() {
        let store = MemoryStore::new();
        store.insert_certificate(&Certificate::new(1, 2)).await.unwrap();
        let err = store
            .insert_certificate(&Certificate::new(1, 2))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn quiz_attempts_keep_best_score_and_first_pass() {
        let store = MemoryStore::new();
        let first = store.record_quiz_attempt(1, 9, 40.0, false, 0).await.unwrap();
        assert!(!first.first_pass);
        let second = store.record_quiz_attempt(1, 9, 80.0, true, 0).await.unwrap();
        assert!(second.first_pass);
        let third = store.record_quiz_attempt(1, 9, 60.0, true, 0).await.unwrap();
        assert!(!third.first_pass);
        assert_eq!(third.record.attempts, 3);
        assert_eq!(third.record.best_score, 80.0);
    }

    #[tokio::test]
    async fn deleting_a_course_drops_its_ledgers() {
        let store = MemoryStore::new();
        let course = store
            .create_course(NewCourse {
                owner_id: 1,
                name: "Rust".to_string(),
                description: String::new(),
            })
            .await
            .unwrap();
        store.complete_unit(5, course.id, 10, 0).await.unwrap();
        store.increment_xp(5, course.id, 20).await.unwrap();

        assert!(store.delete_course(course.id).await.unwrap());
        assert!(store.completed_unit_ids(5, course.id).await.unwrap().is_empty());
        assert!(store.get_gamification(5, course.id).await.unwrap().is_none());
        assert!(!store.delete_course(course.id).await.unwrap());
    }
}
