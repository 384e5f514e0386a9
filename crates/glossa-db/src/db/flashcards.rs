//! Repository for flashcards and review scheduling queries
//!
//! Review writes are compare-and-set on the learning stage: a review
//! computed against a stale stage does not land, the caller sees the
//! conflict and can retry against fresh state.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use glossa_core::error::AppError;
use glossa_core::models::{Flashcard, LearningStage, ReviewStats};

#[derive(Clone)]
pub struct FlashcardRepository {
    pool: PgPool,
}

impl FlashcardRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self), fields(db.table = "flashcards", db.record_id = %id))]
    pub async fn get(&self, user_id: Uuid, id: Uuid) -> Result<Option<Flashcard>, AppError> {
        let card = sqlx::query_as::<Postgres, Flashcard>(
            "SELECT * FROM flashcards WHERE user_id = $1 AND id = $2",
        )
        .bind(user_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(card)
    }

    #[tracing::instrument(skip(self), fields(db.table = "flashcards"))]
    pub async fn list(
        &self,
        user_id: Uuid,
        material_id: Option<Uuid>,
    ) -> Result<Vec<Flashcard>, AppError> {
        let cards = match material_id {
            Some(material_id) => {
                sqlx::query_as::<Postgres, Flashcard>(
                    "SELECT * FROM flashcards WHERE user_id = $1 AND material_id = $2 ORDER BY created_at",
                )
                .bind(user_id)
                .bind(material_id)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<Postgres, Flashcard>(
                    "SELECT * FROM flashcards WHERE user_id = $1 ORDER BY created_at",
                )
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(cards)
    }

    /// Cards whose next review is due at or before `now`, oldest due first.
    /// Fresh cards are seeded with `next_review_at = created_at`, so they
    /// surface immediately.
    #[tracing::instrument(skip(self), fields(db.table = "flashcards", limit = limit))]
    pub async fn due_for_review(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Flashcard>, AppError> {
        let cards = sqlx::query_as::<Postgres, Flashcard>(
            r#"
            SELECT * FROM flashcards
            WHERE user_id = $1 AND next_review_at <= $2
            ORDER BY next_review_at ASC
            LIMIT $3
            "#,
        )
        .bind(user_id)
        .bind(now)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(cards)
    }

    /// Apply a review outcome, conditional on the stage the review was
    /// graded against. Returns `None` when the card changed underneath the
    /// caller (concurrent review) or no longer exists.
    #[tracing::instrument(skip(self), fields(db.table = "flashcards", db.operation = "update", db.record_id = %id))]
    pub async fn apply_review(
        &self,
        user_id: Uuid,
        id: Uuid,
        expected_stage: LearningStage,
        new_stage: LearningStage,
        next_review_at: DateTime<Utc>,
    ) -> Result<Option<Flashcard>, AppError> {
        let card = sqlx::query_as::<Postgres, Flashcard>(
            r#"
            UPDATE flashcards
            SET stage = $4, next_review_at = $5, updated_at = NOW()
            WHERE user_id = $1 AND id = $2 AND stage = $3
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(id)
        .bind(expected_stage.as_i32())
        .bind(new_stage.as_i32())
        .bind(next_review_at)
        .fetch_optional(&self.pool)
        .await?;

        Ok(card)
    }

    /// Aggregate counts for the review dashboard, evaluated in one query.
    #[tracing::instrument(skip(self), fields(db.table = "flashcards", db.operation = "select"))]
    pub async fn stats(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<ReviewStats, AppError> {
        let stats = sqlx::query_as::<Postgres, ReviewStats>(
            r#"
            SELECT
                COUNT(*) AS total_cards,
                COUNT(*) FILTER (WHERE next_review_at <= $2) AS due_for_review,
                COUNT(*) FILTER (WHERE stage = 0) AS new_cards,
                COUNT(*) FILTER (WHERE stage BETWEEN 1 AND 2) AS learning,
                COUNT(*) FILTER (WHERE stage = 5) AS mastered
            FROM flashcards
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(stats)
    }
}
