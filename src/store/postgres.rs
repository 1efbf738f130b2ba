// src/store/postgres.rs

use async_trait::async_trait;
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder, types::Json};

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

/// `Store` backed by Postgres. Uniqueness and atomic increments are enforced
/// by the schema in `migrations/`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_gamification(
        &self,
        user_id: i64,
        course_id: i64,
        xp: i64,
    ) -> Result<GamificationEntry, StoreError> {
        let badges: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT badge
            FROM badge_unlocks
            WHERE user_id = $1 AND course_id = $2
            ORDER BY id
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(GamificationEntry {
            user_id,
            course_id,
            xp,
            badges,
        })
    }
}

/// Adds `amount` to the (user, course) entry and returns the new total.
/// BIGINT overflow surfaces as `StoreError::OutOfRange`.
async fn upsert_xp<'e, E: PgExecutor<'e>>(
    executor: E,
    user_id: i64,
    course_id: i64,
    amount: i64,
) -> Result<i64, StoreError> {
    let xp = sqlx::query_scalar(
        r#"
        INSERT INTO gamification_entries (user_id, course_id, xp)
        VALUES ($1, $2, $3)
        ON CONFLICT (user_id, course_id) DO UPDATE SET
            xp = gamification_entries.xp + EXCLUDED.xp,
            updated_at = NOW()
        RETURNING xp
        "#,
    )
    .bind(user_id)
    .bind(course_id)
    .bind(amount)
    .fetch_one(executor)
    .await?;

    Ok(xp)
}

#[async_trait]
impl Store for PgStore {
    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        role: &str,
    ) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, password, role)
            VALUES ($1, $2, $3)
            RETURNING id, username, password, role, created_at
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .bind(role)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, password, role, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn create_course(&self, new: NewCourse) -> Result<Course, StoreError> {
        let course = sqlx::query_as::<_, Course>(
            r#"
            INSERT INTO courses (name, description, owner_id)
            VALUES ($1, $2, $3)
            RETURNING id, name, description, owner_id, created_at
            "#,
        )
        .bind(new.name)
        .bind(new.description)
        .bind(new.owner_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(course)
    }

    async fn update_course(
        &self,
        id: i64,
        patch: CoursePatch,
    ) -> Result<Option<Course>, StoreError> {
        if patch.name.is_none() && patch.description.is_none() {
            return self.get_course(id).await;
        }

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE courses SET ");
        let mut separated = builder.separated(", ");
        if let Some(name) = patch.name {
            separated.push("name = ");
            separated.push_bind_unseparated(name);
        }
        if let Some(description) = patch.description {
            separated.push("description = ");
            separated.push_bind_unseparated(description);
        }
        builder.push(" WHERE id = ");
        builder.push_bind(id);
        builder.push(" RETURNING id, name, description, owner_id, created_at");

        let course = builder
            .build_query_as::<Course>()
            .fetch_optional(&self.pool)
            .await?;

        Ok(course)
    }

    async fn delete_course(&self, id: i64) -> Result<bool, StoreError> {
        // Units, quizzes, progress, certificates and gamification cascade.
        let result = sqlx::query("DELETE FROM courses WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_course(&self, id: i64) -> Result<Option<Course>, StoreError> {
        let course = sqlx::query_as::<_, Course>(
            "SELECT id, name, description, owner_id, created_at FROM courses WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(course)
    }

    async fn list_courses(&self) -> Result<Vec<Course>, StoreError> {
        let courses = sqlx::query_as::<_, Course>(
            r#"
            SELECT id, name, description, owner_id, created_at
            FROM courses
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(courses)
    }

    async fn add_content_unit(
        &self,
        course_id: i64,
        new: NewContentUnit,
    ) -> Result<ContentUnit, StoreError> {
        let unit = sqlx::query_as::<_, ContentUnit>(
            r#"
            INSERT INTO content_units (course_id, title, video_url, position, required)
            VALUES (
                $1, $2, $3,
                COALESCE($4, (SELECT COALESCE(MAX(position) + 1, 0) FROM content_units WHERE course_id = $1)),
                $5
            )
            RETURNING id, course_id, title, video_url, position, required
            "#,
        )
        .bind(course_id)
        .bind(new.title)
        .bind(new.video_url)
        .bind(new.position)
        .bind(new.required)
        .fetch_one(&self.pool)
        .await?;

        Ok(unit)
    }

    async fn update_content_unit(
        &self,
        course_id: i64,
        unit_id: i64,
        patch: ContentUnitPatch,
    ) -> Result<Option<ContentUnit>, StoreError> {
        let unit = sqlx::query_as::<_, ContentUnit>(
            r#"
            UPDATE content_units SET
                title = COALESCE($3, title),
                video_url = COALESCE($4, video_url),
                position = COALESCE($5, position),
                required = COALESCE($6, required)
            WHERE id = $1 AND course_id = $2
            RETURNING id, course_id, title, video_url, position, required
            "#,
        )
        .bind(unit_id)
        .bind(course_id)
        .bind(patch.title)
        .bind(patch.video_url)
        .bind(patch.position)
        .bind(patch.required)
        .fetch_optional(&self.pool)
        .await?;

        Ok(unit)
    }

    async fn list_content_units(&self, course_id: i64) -> Result<Vec<ContentUnit>, StoreError> {
        let units = sqlx::query_as::<_, ContentUnit>(
            r#"
            SELECT id, course_id, title, video_url, position, required
            FROM content_units
            WHERE course_id = $1
            ORDER BY position, id
            "#,
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(units)
    }

    async fn create_quiz(&self, course_id: i64, new: NewQuiz) -> Result<Quiz, StoreError> {
        let quiz = sqlx::query_as::<_, Quiz>(
            r#"
            INSERT INTO quizzes (course_id, content_unit_id, title, questions, passing_score, time_limit)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, course_id, content_unit_id, title, questions, passing_score, time_limit
            "#,
        )
        .bind(course_id)
        .bind(new.content_unit_id)
        .bind(new.title)
        .bind(Json(new.questions))
        .bind(new.passing_score)
        .bind(new.time_limit)
        .fetch_one(&self.pool)
        .await?;

        Ok(quiz)
    }

    async fn get_quiz(&self, id: i64) -> Result<Option<Quiz>, StoreError> {
        let quiz = sqlx::query_as::<_, Quiz>(
            r#"
            SELECT id, course_id, content_unit_id, title, questions, passing_score, time_limit
            FROM quizzes
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(quiz)
    }

    async fn list_quizzes(&self, course_id: i64) -> Result<Vec<Quiz>, StoreError> {
        let quizzes = sqlx::query_as::<_, Quiz>(
            r#"
            SELECT id, course_id, content_unit_id, title, questions, passing_score, time_limit
            FROM quizzes
            WHERE course_id = $1
            ORDER BY id
            "#,
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(quizzes)
    }

    async fn record_quiz_attempt(
        &self,
        user_id: i64,
        quiz_id: i64,
        score: f64,
        passed: bool,
        pass_xp: i64,
    ) -> Result<QuizAttemptOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;

        // Upsert: keep the highest score if the learner retakes the quiz.
        // The row lock taken here serializes concurrent attempts until commit.
        sqlx::query(
            r#"
            INSERT INTO quiz_records (user_id, quiz_id, best_score, attempts)
            VALUES ($1, $2, $3, 1)
            ON CONFLICT (user_id, quiz_id) DO UPDATE SET
                best_score = GREATEST(quiz_records.best_score, EXCLUDED.best_score),
                attempts = quiz_records.attempts + 1
            "#,
        )
        .bind(user_id)
        .bind(quiz_id)
        .bind(score)
        .execute(&mut *tx)
        .await?;

        let first_pass = if passed {
            sqlx::query(
                r#"
                UPDATE quiz_records SET passed_at = NOW()
                WHERE user_id = $1 AND quiz_id = $2 AND passed_at IS NULL
                "#,
            )
            .bind(user_id)
            .bind(quiz_id)
            .execute(&mut *tx)
            .await?
            .rows_affected()
                == 1
        } else {
            false
        };

        let record = sqlx::query_as::<_, QuizRecord>(
            r#"
            SELECT user_id, quiz_id, best_score, attempts, passed_at
            FROM quiz_records
            WHERE user_id = $1 AND quiz_id = $2
            "#,
        )
        .bind(user_id)
        .bind(quiz_id)
        .fetch_one(&mut *tx)
        .await?;

        // The reward commits or rolls back together with `passed_at`.
        let reward = if first_pass && pass_xp > 0 {
            let course_id: i64 = sqlx::query_scalar("SELECT course_id FROM quizzes WHERE id = $1")
                .bind(quiz_id)
                .fetch_one(&mut *tx)
                .await?;
            let xp = upsert_xp(&mut *tx, user_id, course_id, pass_xp).await?;
            Some((course_id, xp))
        } else {
            None
        };

        tx.commit().await?;

        let gamification = match reward {
            Some((course_id, xp)) => Some(self.load_gamification(user_id, course_id, xp).await?),
            None => None,
        };

        Ok(QuizAttemptOutcome {
            record,
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
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO progress_entries (user_id, course_id, content_unit_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, course_id, content_unit_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .bind(content_unit_id)
        .execute(&mut *tx)
        .await?
        .rows_affected()
            == 1;

        let xp = if inserted && xp_award > 0 {
            Some(upsert_xp(&mut *tx, user_id, course_id, xp_award).await?)
        } else {
            None
        };

        tx.commit().await?;

        let gamification = match xp {
            Some(xp) => Some(self.load_gamification(user_id, course_id, xp).await?),
            None => None,
        };

        Ok(UnitCompletion {
            inserted,
            gamification,
        })
    }

    async fn completed_unit_ids(
        &self,
        user_id: i64,
        course_id: i64,
    ) -> Result<Vec<i64>, StoreError> {
        let ids: Vec<i64> = sqlx::query_scalar(
            r#"
            SELECT content_unit_id
            FROM progress_entries
            WHERE user_id = $1 AND course_id = $2
            ORDER BY completed_at, content_unit_id
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    async fn find_certificate(
        &self,
        user_id: i64,
        course_id: i64,
    ) -> Result<Option<Certificate>, StoreError> {
        let certificate = sqlx::query_as::<_, Certificate>(
            r#"
            SELECT certificate_id, user_id, course_id, issued_at
            FROM certificates
            WHERE user_id = $1 AND course_id = $2
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(certificate)
    }

    async fn find_certificate_by_id(
        &self,
        certificate_id: &str,
    ) -> Result<Option<Certificate>, StoreError> {
        let certificate = sqlx::query_as::<_, Certificate>(
            r#"
            SELECT certificate_id, user_id, course_id, issued_at
            FROM certificates
            WHERE certificate_id = $1
            "#,
        )
        .bind(certificate_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(certificate)
    }

    async fn list_certificates(&self, user_id: i64) -> Result<Vec<Certificate>, StoreError> {
        let certificates = sqlx::query_as::<_, Certificate>(
            r#"
            SELECT certificate_id, user_id, course_id, issued_at
            FROM certificates
            WHERE user_id = $1
            ORDER BY issued_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(certificates)
    }

    async fn insert_certificate(&self, certificate: &Certificate) -> Result<(), StoreError> {
        // UNIQUE (user_id, course_id) turns a lost race into StoreError::Conflict.
        sqlx::query(
            r#"
            INSERT INTO certificates (certificate_id, user_id, course_id, issued_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&certificate.certificate_id)
        .bind(certificate.user_id)
        .bind(certificate.course_id)
        .bind(certificate.issued_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_gamification(
        &self,
        user_id: i64,
        course_id: i64,
    ) -> Result<Option<GamificationEntry>, StoreError> {
        let xp: Option<i64> = sqlx::query_scalar(
            "SELECT xp FROM gamification_entries WHERE user_id = $1 AND course_id = $2",
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await?;

        match xp {
            Some(xp) => Ok(Some(self.load_gamification(user_id, course_id, xp).await?)),
            None => Ok(None),
        }
    }

    async fn increment_xp(
        &self,
        user_id: i64,
        course_id: i64,
        amount: i64,
    ) -> Result<GamificationEntry, StoreError> {
        let xp = upsert_xp(&self.pool, user_id, course_id, amount).await?;
        self.load_gamification(user_id, course_id, xp).await
    }

    async fn unlock_badges(
        &self,
        user_id: i64,
        course_id: i64,
        badges: &[String],
    ) -> Result<GamificationEntry, StoreError> {
        let mut tx = self.pool.begin().await?;

        let xp: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO gamification_entries (user_id, course_id, xp)
            VALUES ($1, $2, 0)
            ON CONFLICT (user_id, course_id) DO UPDATE SET updated_at = NOW()
            RETURNING xp
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO badge_unlocks (user_id, course_id, badge)
            SELECT $1, $2, t.badge
            FROM UNNEST($3::TEXT[]) WITH ORDINALITY AS t(badge, ord)
            ORDER BY t.ord
            ON CONFLICT (user_id, course_id, badge) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .bind(badges)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.load_gamification(user_id, course_id, xp).await
    }
}
