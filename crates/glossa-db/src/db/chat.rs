//! Repository for per-material chat history

use chrono::Utc;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use glossa_core::error::AppError;
use glossa_core::models::{ChatMessage, ChatRole};

#[derive(Clone)]
pub struct ChatRepository {
    pool: PgPool,
}

impl ChatRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self, content), fields(db.table = "chat_messages", db.operation = "insert", role = %role))]
    pub async fn append(
        &self,
        user_id: Uuid,
        material_id: Uuid,
        role: ChatRole,
        content: &str,
    ) -> Result<ChatMessage, AppError> {
        let message = sqlx::query_as::<Postgres, ChatMessage>(
            r#"
            INSERT INTO chat_messages (id, material_id, user_id, role, content, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(material_id)
        .bind(user_id)
        .bind(role)
        .bind(content)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(message)
    }

    /// Full history for a material, oldest first.
    #[tracing::instrument(skip(self), fields(db.table = "chat_messages"))]
    pub async fn list_for_material(
        &self,
        user_id: Uuid,
        material_id: Uuid,
    ) -> Result<Vec<ChatMessage>, AppError> {
        let messages = sqlx::query_as::<Postgres, ChatMessage>(
            "SELECT * FROM chat_messages WHERE user_id = $1 AND material_id = $2 ORDER BY created_at",
        )
        .bind(user_id)
        .bind(material_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(messages)
    }

    /// Remove a single message. Used to drop a user turn whose reply
    /// never materialized.
    #[tracing::instrument(skip(self), fields(db.table = "chat_messages", db.operation = "delete", db.record_id = %id))]
    pub async fn delete_message(&self, id: Uuid) -> Result<bool, AppError> {
        let rows_affected = sqlx::query("DELETE FROM chat_messages WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(rows_affected > 0)
    }

    #[tracing::instrument(skip(self), fields(db.table = "chat_messages", db.operation = "delete"))]
    pub async fn clear_for_material(
        &self,
        user_id: Uuid,
        material_id: Uuid,
    ) -> Result<u64, AppError> {
        let rows_affected =
            sqlx::query("DELETE FROM chat_messages WHERE user_id = $1 AND material_id = $2")
                .bind(user_id)
                .bind(material_id)
                .execute(&self.pool)
                .await?
                .rows_affected();

        Ok(rows_affected)
    }
}
