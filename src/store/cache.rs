// src/store/cache.rs

//! Read-through cache in front of any `Store`.
//!
//! Entries expire after a TTL and are dropped eagerly whenever a write touches
//! the same key, so reads never depend on the cache for correctness. Expired
//! entries are swept at most once per TTL, and each map holds at most
//! `MAX_ENTRIES` rows.

use std::{
    collections::HashMap,
    hash::Hash,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    models::{
        certificate::Certificate,
        course::{ContentUnit, Course},
        gamification::GamificationEntry,
        quiz::Quiz,
        user::User,
    },
    store::{
        ContentUnitPatch, CoursePatch, NewContentUnit, NewCourse, NewQuiz, QuizAttemptOutcome,
        Store, StoreError, UnitCompletion,
    },
};

/// Upper bound on rows per cached map. Misses past it go straight to the store.
pub const MAX_ENTRIES: usize = 10_000;

type UserCourse = (i64, i64);

struct Cached<T> {
    value: T,
    stored_at: Instant,
}

struct CacheState {
    /// Bumped on every invalidation. A read that started under an older
    /// generation must not repopulate the cache with what it loaded.
    generation: u64,
    last_sweep: Instant,
    courses: HashMap<i64, Cached<Course>>,
    units: HashMap<i64, Cached<Vec<ContentUnit>>>,
    quizzes: HashMap<i64, Cached<Quiz>>,
    completed: HashMap<UserCourse, Cached<Vec<i64>>>,
    certificates: HashMap<UserCourse, Cached<Certificate>>,
    gamification: HashMap<UserCourse, Cached<GamificationEntry>>,
}

impl CacheState {
    fn new() -> Self {
        Self {
            generation: 0,
            last_sweep: Instant::now(),
            courses: HashMap::new(),
            units: HashMap::new(),
            quizzes: HashMap::new(),
            completed: HashMap::new(),
            certificates: HashMap::new(),
            gamification: HashMap::new(),
        }
    }

    /// Drops expired rows from every map, at most once per `ttl`.
    fn sweep(&mut self, ttl: Duration) {
        if self.last_sweep.elapsed() < ttl {
            return;
        }
        self.last_sweep = Instant::now();
        let live = |stored_at: Instant| stored_at.elapsed() < ttl;
        self.courses.retain(|_, c| live(c.stored_at));
        self.units.retain(|_, c| live(c.stored_at));
        self.quizzes.retain(|_, c| live(c.stored_at));
        self.completed.retain(|_, c| live(c.stored_at));
        self.certificates.retain(|_, c| live(c.stored_at));
        self.gamification.retain(|_, c| live(c.stored_at));
    }

    fn invalidate(&mut self) -> &mut Self {
        self.generation += 1;
        self
    }

    fn forget_course(&mut self, course_id: i64) {
        self.courses.remove(&course_id);
        self.units.remove(&course_id);
        self.quizzes.retain(|_, q| q.value.course_id != course_id);
        self.completed.retain(|(_, c), _| *c != course_id);
        self.certificates.retain(|(_, c), _| *c != course_id);
        self.gamification.retain(|(_, c), _| *c != course_id);
    }
}

fn fresh<K: Eq + Hash, T: Clone>(map: &HashMap<K, Cached<T>>, key: &K, ttl: Duration) -> Option<T> {
    map.get(key)
        .filter(|c| c.stored_at.elapsed() < ttl)
        .map(|c| c.value.clone())
}

fn remember<K: Eq + Hash, T>(map: &mut HashMap<K, Cached<T>>, key: K, value: T) {
    if map.len() >= MAX_ENTRIES && !map.contains_key(&key) {
        return;
    }
    map.insert(
        key,
        Cached {
            value,
            stored_at: Instant::now(),
        },
    );
}

pub struct CachedStore<S> {
    inner: S,
    ttl: Duration,
    state: RwLock<CacheState>,
}

impl<S: Store> CachedStore<S> {
    pub fn new(inner: S, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            state: RwLock::new(CacheState::new()),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: Store> Store for CachedStore<S> {
    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        role: &str,
    ) -> Result<User, StoreError> {
        self.inner.create_user(username, password_hash, role).await
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        self.inner.find_user_by_username(username).await
    }

    async fn create_course(&self, new: NewCourse) -> Result<Course, StoreError> {
        self.inner.create_course(new).await
    }

    async fn update_course(
        &self,
        id: i64,
        patch: CoursePatch,
    ) -> Result<Option<Course>, StoreError> {
        let result = self.inner.update_course(id, patch).await;
        self.state.write().await.invalidate().courses.remove(&id);
        result
    }

    async fn delete_course(&self, id: i64) -> Result<bool, StoreError> {
        let result = self.inner.delete_course(id).await;
        self.state.write().await.invalidate().forget_course(id);
        result
    }

    async fn get_course(&self, id: i64) -> Result<Option<Course>, StoreError> {
        let generation = {
            let state = self.state.read().await;
            if let Some(course) = fresh(&state.courses, &id, self.ttl) {
                return Ok(Some(course));
            }
            state.generation
        };
        let course = self.inner.get_course(id).await?;
        if let Some(course) = &course {
            let mut state = self.state.write().await;
            state.sweep(self.ttl);
            if state.generation == generation {
                remember(&mut state.courses, id, course.clone());
            }
        }
        Ok(course)
    }

    async fn list_courses(&self) -> Result<Vec<Course>, StoreError> {
        self.inner.list_courses().await
    }

    async fn add_content_unit(
        &self,
        course_id: i64,
        new: NewContentUnit,
    ) -> Result<ContentUnit, StoreError> {
        let result = self.inner.add_content_unit(course_id, new).await;
        self.state.write().await.invalidate().units.remove(&course_id);
        result
    }

    async fn update_content_unit(
        &self,
        course_id: i64,
        unit_id: i64,
        patch: ContentUnitPatch,
    ) -> Result<Option<ContentUnit>, StoreError> {
        let result = self.inner.update_content_unit(course_id, unit_id, patch).await;
        self.state.write().await.invalidate().units.remove(&course_id);
        result
    }

    async fn list_content_units(&self, course_id: i64) -> Result<Vec<ContentUnit>, StoreError> {
        let generation = {
            let state = self.state.read().await;
            if let Some(units) = fresh(&state.units, &course_id, self.ttl) {
                return Ok(units);
            }
            state.generation
        };
        let units = self.inner.list_content_units(course_id).await?;
        let mut state = self.state.write().await;
        state.sweep(self.ttl);
        if state.generation == generation {
            remember(&mut state.units, course_id, units.clone());
        }
        Ok(units)
    }

    async fn create_quiz(&self, course_id: i64, new: NewQuiz) -> Result<Quiz, StoreError> {
        self.inner.create_quiz(course_id, new).await
    }

    async fn get_quiz(&self, id: i64) -> Result<Option<Quiz>, StoreError> {
        let generation = {
            let state = self.state.read().await;
            if let Some(quiz) = fresh(&state.quizzes, &id, self.ttl) {
                return Ok(Some(quiz));
            }
            state.generation
        };
        let quiz = self.inner.get_quiz(id).await?;
        if let Some(quiz) = &quiz {
            let mut state = self.state.write().await;
            state.sweep(self.ttl);
            if state.generation == generation {
                remember(&mut state.quizzes, id, quiz.clone());
            }
        }
        Ok(quiz)
    }

    async fn list_quizzes(&self, course_id: i64) -> Result<Vec<Quiz>, StoreError> {
        self.inner.list_quizzes(course_id).await
    }

    async fn record_quiz_attempt(
        &self,
        user_id: i64,
        quiz_id: i64,
        score: f64,
        passed: bool,
        pass_xp: i64,
    ) -> Result<QuizAttemptOutcome, StoreError> {
        let result = self
            .inner
            .record_quiz_attempt(user_id, quiz_id, score, passed, pass_xp)
            .await;
        if let Ok(QuizAttemptOutcome {
            gamification: Some(entry),
            ..
        }) = &result
        {
            self.state
                .write()
                .await
                .invalidate()
                .gamification
                .remove(&(entry.user_id, entry.course_id));
        }
        result
    }

    async fn complete_unit(
        &self,
        user_id: i64,
        course_id: i64,
        content_unit_id: i64,
        xp_award: i64,
    ) -> Result<UnitCompletion, StoreError> {
        let result = self
            .inner
            .complete_unit(user_id, course_id, content_unit_id, xp_award)
            .await;
        let mut state = self.state.write().await;
        let state = state.invalidate();
        state.completed.remove(&(user_id, course_id));
        state.gamification.remove(&(user_id, course_id));
        result
    }

    async fn completed_unit_ids(
        &self,
        user_id: i64,
        course_id: i64,
    ) -> Result<Vec<i64>, StoreError> {
        let key = (user_id, course_id);
        let generation = {
            let state = self.state.read().await;
            if let Some(ids) = fresh(&state.completed, &key, self.ttl) {
                return Ok(ids);
            }
            state.generation
        };
        let ids = self.inner.completed_unit_ids(user_id, course_id).await?;
        let mut state = self.state.write().await;
        state.sweep(self.ttl);
        if state.generation == generation {
            remember(&mut state.completed, key, ids.clone());
        }
        Ok(ids)
    }

    async fn find_certificate(
        &self,
        user_id: i64,
        course_id: i64,
    ) -> Result<Option<Certificate>, StoreError> {
        let key = (user_id, course_id);
        let generation = {
            let state = self.state.read().await;
            if let Some(certificate) = fresh(&state.certificates, &key, self.ttl) {
                return Ok(Some(certificate));
            }
            state.generation
        };
        let certificate = self.inner.find_certificate(user_id, course_id).await?;
        if let Some(certificate) = &certificate {
            let mut state = self.state.write().await;
            state.sweep(self.ttl);
            if state.generation == generation {
                remember(&mut state.certificates, key, certificate.clone());
            }
        }
        Ok(certificate)
    }

    async fn find_certificate_by_id(
        &self,
        certificate_id: &str,
    ) -> Result<Option<Certificate>, StoreError> {
        self.inner.find_certificate_by_id(certificate_id).await
    }

    async fn list_certificates(&self, user_id: i64) -> Result<Vec<Certificate>, StoreError> {
        self.inner.list_certificates(user_id).await
    }

    async fn insert_certificate(&self, certificate: &Certificate) -> Result<(), StoreError> {
        let result = self.inner.insert_certificate(certificate).await;
        self.state
            .write()
            .await
            .invalidate()
            .certificates
            .remove(&(certificate.user_id, certificate.course_id));
        result
    }

    async fn get_gamification(
        &self,
        user_id: i64,
        course_id: i64,
    ) -> Result<Option<GamificationEntry>, StoreError> {
        let key = (user_id, course_id);
        let generation = {
            let state = self.state.read().await;
            if let Some(entry) = fresh(&state.gamification, &key, self.ttl) {
                return Ok(Some(entry));
            }
            state.generation
        };
        let entry = self.inner.get_gamification(user_id, course_id).await?;
        if let Some(entry) = &entry {
            let mut state = self.state.write().await;
            state.sweep(self.ttl);
            if state.generation == generation {
                remember(&mut state.gamification, key, entry.clone());
            }
        }
        Ok(entry)
    }

    async fn increment_xp(
        &self,
        user_id: i64,
        course_id: i64,
        amount: i64,
    ) -> Result<GamificationEntry, StoreError> {
        let result = self.inner.increment_xp(user_id, course_id, amount).await;
        self.state
            .write()
            .await
            .invalidate()
            .gamification
            .remove(&(user_id, course_id));
        result
    }

    async fn unlock_badges(
        &self,
        user_id: i64,
        course_id: i64,
        badges: &[String],
    ) -> Result<GamificationEntry, StoreError> {
        let result = self.inner.unlock_badges(user_id, course_id, badges).await;
        self.state
            .write()
            .await
            .invalidate()
            .gamification
            .remove(&(user_id, course_id));
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn cached() -> CachedStore<MemoryStore> {
        CachedStore::new(MemoryStore::new(), Duration::from_secs(60))
    }

    #[tokio::test]
    async fn progress_write_invalidates_completed_set_and_xp() {
        let store = cached();
        assert!(store.completed_unit_ids(1, 2).await.unwrap().is_empty());
        assert!(store.get_gamification(1, 2).await.unwrap().is_none());
        store.increment_xp(1, 2, 5).await.unwrap();
        assert_eq!(store.get_gamification(1, 2).await.unwrap().unwrap().xp, 5);

        store.complete_unit(1, 2, 3, 10).await.unwrap();

        assert_eq!(store.completed_unit_ids(1, 2).await.unwrap(), vec![3]);
        assert_eq!(store.get_gamification(1, 2).await.unwrap().unwrap().xp, 15);
    }

    #[tokio::test]
    async fn expired_entries_are_swept() {
        let store = CachedStore::new(MemoryStore::new(), Duration::from_millis(1));
        for user_id in 0..1_000 {
            store.completed_unit_ids(user_id, 1).await.unwrap();
        }

        tokio::time::sleep(Duration::from_millis(20)).await;
        store.completed_unit_ids(5_000, 1).await.unwrap();

        assert_eq!(store.state.read().await.completed.len(), 1);
    }

    #[tokio::test]
    async fn maps_stop_growing_at_capacity() {
        let store = cached();
        for user_id in 0..(MAX_ENTRIES as i64 + 50) {
            store.completed_unit_ids(user_id, 1).await.unwrap();
        }

        assert_eq!(store.state.read().await.completed.len(), MAX_ENTRIES);
        // Misses past the bound are still served from the store.
        store.complete_unit(MAX_ENTRIES as i64 + 10, 1, 7, 0).await.unwrap();
        assert_eq!(
            store
                .completed_unit_ids(MAX_ENTRIES as i64 + 10, 1)
                .await
                .unwrap(),
            vec![7]
        );
    }

    #[tokio::test]
    async fn xp_write_invalidates_gamification_entry() {
        let store = cached();
        store.increment_xp(1, 2, 10).await.unwrap();
        assert_eq!(store.get_gamification(1, 2).await.unwrap().unwrap().xp, 10);

        store.increment_xp(1, 2, 5).await.unwrap();

        assert_eq!(store.get_gamification(1, 2).await.unwrap().unwrap().xp, 15);
    }

    #[tokio::test]
    async fn expired_entries_are_reloaded() {
        let store = CachedStore::new(MemoryStore::new(), Duration::ZERO);
        store.increment_xp(1, 2, 10).await.unwrap();
        assert_eq!(store.get_gamification(1, 2).await.unwrap().unwrap().xp, 10);

        // Bypass the cache: a zero TTL means the next read still sees the write.
        store.inner().increment_xp(1, 2, 10).await.unwrap();

        assert_eq!(store.get_gamification(1, 2).await.unwrap().unwrap().xp, 20);
    }

    #[tokio::test]
    async fn deleting_course_forgets_cached_rows() {
        let store = cached();
        let course = store
            .create_course(NewCourse {
                owner_id: 1,
                name: "Rust".to_string(),
                description: String::new(),
            })
            .await
            .unwrap();
        assert!(store.get_course(course.id).await.unwrap().is_some());

        store.delete_course(course.id).await.unwrap();

        assert!(store.get_course(course.id).await.unwrap().is_none());
    }
}
