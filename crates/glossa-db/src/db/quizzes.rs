//! Repository for generated quizzes
//!
//! Submission is first-write-wins: the score update is conditional on
//! `completed_at IS NULL`, so a second submission for the same quiz
//! never lands.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use glossa_core::error::AppError;
use glossa_core::models::{Quiz, QuizQuestion};

#[derive(Clone)]
pub struct QuizRepository {
    pool: PgPool,
}

impl QuizRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self, questions), fields(db.table = "quizzes", db.operation = "insert", question_count = questions.len()))]
    pub async fn create(
        &self,
        user_id: Uuid,
        material_id: Uuid,
        questions: &[QuizQuestion],
    ) -> Result<Quiz, AppError> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let questions_json = serde_json::to_value(questions)?;

        let quiz = sqlx::query_as::<Postgres, Quiz>(
            r#"
            INSERT INTO quizzes (id, material_id, user_id, questions, total_questions, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(material_id)
        .bind(user_id)
        .bind(questions_json)
        .bind(questions.len() as i32)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(quiz)
    }

    #[tracing::instrument(skip(self), fields(db.table = "quizzes", db.record_id = %id))]
    pub async fn get(&self, user_id: Uuid, id: Uuid) -> Result<Option<Quiz>, AppError> {
        let quiz = sqlx::query_as::<Postgres, Quiz>(
            "SELECT * FROM quizzes WHERE user_id = $1 AND id = $2",
        )
        .bind(user_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(quiz)
    }

    #[tracing::instrument(skip(self), fields(db.table = "quizzes"))]
    pub async fn list(
        &self,
        user_id: Uuid,
        material_id: Option<Uuid>,
    ) -> Result<Vec<Quiz>, AppError> {
        let quizzes = match material_id {
            Some(material_id) => {
                sqlx::query_as::<Postgres, Quiz>(
                    "SELECT * FROM quizzes WHERE user_id = $1 AND material_id = $2 ORDER BY created_at DESC",
                )
                .bind(user_id)
                .bind(material_id)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<Postgres, Quiz>(
                    "SELECT * FROM quizzes WHERE user_id = $1 ORDER BY created_at DESC",
                )
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(quizzes)
    }

    /// Number of quizzes already generated for a material, for the
    /// per-material quota check.
    #[tracing::instrument(skip(self), fields(db.table = "quizzes", db.operation = "select"))]
    pub async fn count_for_material(
        &self,
        user_id: Uuid,
        material_id: Uuid,
    ) -> Result<i64, AppError> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM quizzes WHERE user_id = $1 AND material_id = $2",
        )
        .bind(user_id)
        .bind(material_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Record a submission. Conditional on the quiz never having been
    /// submitted; returns `None` when a prior submission already landed
    /// or the quiz does not exist.
    #[tracing::instrument(skip(self), fields(db.table = "quizzes", db.operation = "update", db.record_id = %id))]
    pub async fn record_submission(
        &self,
        user_id: Uuid,
        id: Uuid,
        score: i32,
        completed_at: DateTime<Utc>,
    ) -> Result<Option<Quiz>, AppError> {
        let quiz = sqlx::query_as::<Postgres, Quiz>(
            r#"
            UPDATE quizzes
            SET score = $3, completed_at = $4
            WHERE user_id = $1 AND id = $2 AND completed_at IS NULL
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(id)
        .bind(score)
        .bind(completed_at)
        .fetch_optional(&self.pool)
        .await?;

        Ok(quiz)
    }

    #[tracing::instrument(skip(self), fields(db.table = "quizzes", db.operation = "delete", db.record_id = %id))]
    pub async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let rows_affected = sqlx::query("DELETE FROM quizzes WHERE user_id = $1 AND id = $2")
            .bind(user_id)
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(rows_affected > 0)
    }
}
