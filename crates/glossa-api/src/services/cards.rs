//! Flashcard review: the due queue, review submissions, and aggregate stats.
//!
//! Stage transitions are computed by `glossa_core::srs` and written with a
//! compare-and-swap on the stage the caller saw, so two sessions reviewing
//! the same card cannot double-advance it.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use glossa_core::models::{Flashcard, ReviewOutcome, ReviewStats};
use glossa_core::srs::{apply_review, ReviewQuality};
use glossa_core::AppError;
use glossa_db::stores::FlashcardStore;

/// Default and maximum sizes for the review queue.
const DEFAULT_REVIEW_LIMIT: i64 = 20;
const MAX_REVIEW_LIMIT: i64 = 100;

#[derive(Clone)]
pub struct CardService {
    cards: Arc<dyn FlashcardStore>,
}

impl CardService {
    pub fn new(cards: Arc<dyn FlashcardStore>) -> Self {
        Self { cards }
    }

    /// Cards due now, oldest due date first.
    pub async fn review_queue(
        &self,
        user_id: Uuid,
        limit: Option<i64>,
    ) -> Result<Vec<Flashcard>, AppError> {
        let limit = limit.unwrap_or(DEFAULT_REVIEW_LIMIT).clamp(1, MAX_REVIEW_LIMIT);
        self.cards.due_for_review(user_id, Utc::now(), limit).await
    }

    /// Record one review outcome and reschedule the card.
    ///
    /// The store write is conditional on the stage we read; a lost race
    /// surfaces as `Conflict` rather than silently stacking transitions.
    pub async fn submit_review(
        &self,
        user_id: Uuid,
        card_id: Uuid,
        quality: ReviewQuality,
    ) -> Result<ReviewOutcome, AppError> {
        let card = self
            .cards
            .get(user_id, card_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Flashcard not found".to_string()))?;

        let now = Utc::now();
        let (new_stage, next_review_at) = apply_review(card.stage, quality, now);

        let updated = self
            .cards
            .apply_review(user_id, card_id, card.stage, new_stage, next_review_at)
            .await?
            .ok_or_else(|| {
                AppError::Conflict(
                    "Card was reviewed by another session, refresh and try again".to_string(),
                )
            })?;

        tracing::debug!(
            card_id = %card_id,
            quality = %quality,
            stage = updated.stage.as_i32(),
            "Review recorded"
        );
        Ok(ReviewOutcome::from(&updated))
    }

    /// All cards for the user, optionally narrowed to one material.
    pub async fn list(
        &self,
        user_id: Uuid,
        material_id: Option<Uuid>,
    ) -> Result<Vec<Flashcard>, AppError> {
        self.cards.list(user_id, material_id).await
    }

    pub async fn stats(&self, user_id: Uuid) -> Result<ReviewStats, AppError> {
        self.cards.stats(user_id, Utc::now()).await
    }
}
