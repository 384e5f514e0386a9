//! Repository for learning materials and the ingestion state machine
//!
//! Status transitions are conditional updates: the `WHERE status = ...`
//! clause makes the database the arbiter when two requests race, so a
//! material can never be claimed for processing twice, and a worker's
//! final write is silently dropped if the material was deleted mid-flight.

use chrono::Utc;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use glossa_core::error::AppError;
use glossa_core::models::{FlashcardDraft, Material, MaterialStatus, SourceKind};

use super::transaction::TransactionGuard;

#[derive(Clone)]
pub struct MaterialRepository {
    pool: PgPool,
}

impl MaterialRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self), fields(db.table = "materials", db.operation = "insert"))]
    pub async fn create(
        &self,
        user_id: Uuid,
        title: &str,
        source_kind: SourceKind,
        source_url: Option<&str>,
        file_path: Option<&str>,
    ) -> Result<Material, AppError> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        let material = sqlx::query_as::<Postgres, Material>(
            r#"
            INSERT INTO materials (id, user_id, title, source_kind, source_url, file_path, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(title)
        .bind(source_kind)
        .bind(source_url)
        .bind(file_path)
        .bind(MaterialStatus::Pending)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(material)
    }

    #[tracing::instrument(skip(self), fields(db.table = "materials", db.record_id = %id))]
    pub async fn get(&self, user_id: Uuid, id: Uuid) -> Result<Option<Material>, AppError> {
        let material = sqlx::query_as::<Postgres, Material>(
            "SELECT * FROM materials WHERE user_id = $1 AND id = $2",
        )
        .bind(user_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(material)
    }

    #[tracing::instrument(skip(self), fields(db.table = "materials"))]
    pub async fn list(&self, user_id: Uuid) -> Result<Vec<Material>, AppError> {
        let materials = sqlx::query_as::<Postgres, Material>(
            "SELECT * FROM materials WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(materials)
    }

    /// Claim a material for processing.
    ///
    /// Only `pending` and `failed` materials can be claimed; the conditional
    /// update returns `None` when another request won the claim or the
    /// material is already completed.
    #[tracing::instrument(skip(self), fields(db.table = "materials", db.operation = "update", db.record_id = %id))]
    pub async fn begin_processing(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Material>, AppError> {
        let material = sqlx::query_as::<Postgres, Material>(
            r#"
            UPDATE materials
            SET status = 'processing', updated_at = NOW()
            WHERE user_id = $1 AND id = $2 AND status IN ('pending', 'failed')
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(material)
    }

    /// Put a claimed material back into its pre-claim status.
    ///
    /// Only valid while the caller still holds the `processing` claim
    /// (e.g. the ingestion queue rejected the job before it started).
    #[tracing::instrument(skip(self), fields(db.table = "materials", db.operation = "update", db.record_id = %id))]
    pub async fn release_claim(&self, id: Uuid, status: MaterialStatus) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE materials
            SET status = $2, updated_at = NOW()
            WHERE id = $1 AND status = 'processing'
            "#,
        )
        .bind(id)
        .bind(status)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Finish ingestion: store the extracted text, replace the material's
    /// flashcards, and mark it `completed`, all in one transaction.
    ///
    /// Returns `false` without writing anything when the material is no
    /// longer in `processing` (deleted mid-flight, or the claim was lost);
    /// the worker's output is discarded in that case.
    #[tracing::instrument(skip(self, extracted_text, cards), fields(db.table = "materials", db.operation = "update", db.record_id = %id, card_count = cards.len()))]
    pub async fn complete_ingestion(
        &self,
        id: Uuid,
        extracted_text: &str,
        cards: &[FlashcardDraft],
    ) -> Result<bool, AppError> {
        let mut tx = TransactionGuard::begin(&self.pool).await?;

        let claimed: Option<(Uuid,)> = sqlx::query_as(
            r#"
            UPDATE materials
            SET status = 'completed', extracted_text = $2, updated_at = NOW()
            WHERE id = $1 AND status = 'processing'
            RETURNING user_id
            "#,
        )
        .bind(id)
        .bind(extracted_text)
        .fetch_optional(&mut **tx)
        .await?;

        let Some((user_id,)) = claimed else {
            tx.rollback().await?;
            return Ok(false);
        };

        // Reprocessing replaces the whole card set for the material.
        sqlx::query("DELETE FROM flashcards WHERE material_id = $1")
            .bind(id)
            .execute(&mut **tx)
            .await?;

        let now = Utc::now();
        for card in cards {
            sqlx::query(
                r#"
                INSERT INTO flashcards
                    (id, material_id, user_id, term, translation, definition, context_snippet, grammar_note, stage, next_review_at, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 0, $9, $9, $9)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(id)
            .bind(user_id)
            .bind(&card.term)
            .bind(&card.translation)
            .bind(card.definition.as_deref())
            .bind(card.context_snippet.as_deref())
            .bind(card.grammar_note.as_deref())
            .bind(now)
            .execute(&mut **tx)
            .await?;
        }

        tx.commit().await?;

        Ok(true)
    }

    /// Mark a processing material as failed.
    ///
    /// Conditional on `processing` so a late failure report cannot
    /// resurrect a deleted or reprocessed material. Returns whether the
    /// write landed.
    #[tracing::instrument(skip(self), fields(db.table = "materials", db.operation = "update", db.record_id = %id))]
    pub async fn mark_failed(&self, id: Uuid) -> Result<bool, AppError> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE materials
            SET status = 'failed', updated_at = NOW()
            WHERE id = $1 AND status = 'processing'
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(rows_affected > 0)
    }

    /// Delete a material. Flashcards, quizzes and chat history go with it
    /// via `ON DELETE CASCADE`.
    #[tracing::instrument(skip(self), fields(db.table = "materials", db.operation = "delete", db.record_id = %id))]
    pub async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let rows_affected = sqlx::query("DELETE FROM materials WHERE user_id = $1 AND id = $2")
            .bind(user_id)
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(rows_affected > 0)
    }
}
