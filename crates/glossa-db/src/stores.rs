//! Store trait abstractions over the repositories
//!
//! These traits define the interface the services need from persistence,
//! allowing for easy mocking and testing without database dependencies.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use glossa_core::error::AppError;
use glossa_core::models::{
    ChatMessage, ChatRole, Flashcard, FlashcardDraft, LearningStage, Material, MaterialStatus,
    Quiz, QuizQuestion, ReviewStats, SourceKind, Subscription,
};

use crate::db::{
    ChatRepository, FlashcardRepository, MaterialRepository, QuizRepository,
    SubscriptionRepository,
};

/// Outcome of an upload-slot reservation.
#[derive(Debug, Clone)]
pub enum UploadReservation {
    /// The slot was taken; the returned row reflects the increment.
    Granted(Subscription),
    /// The weekly limit is already spent. Nothing was written.
    Denied { used: i32 },
}

#[async_trait]
pub trait MaterialStore: Send + Sync {
    async fn create(
        &self,
        user_id: Uuid,
        title: &str,
        source_kind: SourceKind,
        source_url: Option<&str>,
        file_path: Option<&str>,
    ) -> Result<Material, AppError>;

    async fn get(&self, user_id: Uuid, id: Uuid) -> Result<Option<Material>, AppError>;

    async fn list(&self, user_id: Uuid) -> Result<Vec<Material>, AppError>;

    /// Claim the material for processing; `None` when it is not claimable.
    async fn begin_processing(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Material>, AppError>;

    /// Undo a claim that never reached the queue.
    async fn release_claim(&self, id: Uuid, status: MaterialStatus) -> Result<(), AppError>;

    /// Store extraction output and swap in the new flashcard set; `false`
    /// when the claim was lost and the write was suppressed.
    async fn complete_ingestion(
        &self,
        id: Uuid,
        extracted_text: &str,
        cards: &[FlashcardDraft],
    ) -> Result<bool, AppError>;

    async fn mark_failed(&self, id: Uuid) -> Result<bool, AppError>;

    async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<bool, AppError>;
}

#[async_trait]
pub trait FlashcardStore: Send + Sync {
    async fn get(&self, user_id: Uuid, id: Uuid) -> Result<Option<Flashcard>, AppError>;

    async fn list(
        &self,
        user_id: Uuid,
        material_id: Option<Uuid>,
    ) -> Result<Vec<Flashcard>, AppError>;

    async fn due_for_review(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Flashcard>, AppError>;

    /// Conditional on `expected_stage`; `None` means the card moved or is gone.
    async fn apply_review(
        &self,
        user_id: Uuid,
        id: Uuid,
        expected_stage: LearningStage,
        new_stage: LearningStage,
        next_review_at: DateTime<Utc>,
    ) -> Result<Option<Flashcard>, AppError>;

    async fn stats(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<ReviewStats, AppError>;
}

#[async_trait]
pub trait QuizStore: Send + Sync {
    async fn create(
        &self,
        user_id: Uuid,
        material_id: Uuid,
        questions: &[QuizQuestion],
    ) -> Result<Quiz, AppError>;

    async fn get(&self, user_id: Uuid, id: Uuid) -> Result<Option<Quiz>, AppError>;

    async fn list(
        &self,
        user_id: Uuid,
        material_id: Option<Uuid>,
    ) -> Result<Vec<Quiz>, AppError>;

    async fn count_for_material(
        &self,
        user_id: Uuid,
        material_id: Uuid,
    ) -> Result<i64, AppError>;

    /// First submission wins; `None` when one already landed or the quiz
    /// does not exist.
    async fn record_submission(
        &self,
        user_id: Uuid,
        id: Uuid,
        score: i32,
        completed_at: DateTime<Utc>,
    ) -> Result<Option<Quiz>, AppError>;

    async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<bool, AppError>;
}

#[async_trait]
pub trait ChatStore: Send + Sync {
    async fn append(
        &self,
        user_id: Uuid,
        material_id: Uuid,
        role: ChatRole,
        content: &str,
    ) -> Result<ChatMessage, AppError>;

    async fn list_for_material(
        &self,
        user_id: Uuid,
        material_id: Uuid,
    ) -> Result<Vec<ChatMessage>, AppError>;

    async fn delete_message(&self, id: Uuid) -> Result<bool, AppError>;

    async fn clear_for_material(
        &self,
        user_id: Uuid,
        material_id: Uuid,
    ) -> Result<u64, AppError>;
}

#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    async fn get(&self, user_id: Uuid) -> Result<Option<Subscription>, AppError>;

    async fn get_or_create(
        &self,
        user_id: Uuid,
        trial_end: DateTime<Utc>,
    ) -> Result<Subscription, AppError>;

    async fn reserve_upload(
        &self,
        user_id: Uuid,
        limit: i32,
    ) -> Result<UploadReservation, AppError>;

    async fn persist_window_roll(
        &self,
        subscription: &Subscription,
        used: i32,
        reset_at: DateTime<Utc>,
    ) -> Result<(), AppError>;

    async fn set_cancel_at_period_end(
        &self,
        user_id: Uuid,
        cancel: bool,
    ) -> Result<Option<Subscription>, AppError>;

    async fn ensure_billing_customer(
        &self,
        user_id: Uuid,
        customer_id: &str,
    ) -> Result<Option<Subscription>, AppError>;
}

// Implementations for the concrete repository types

#[async_trait]
impl MaterialStore for MaterialRepository {
    async fn create(
        &self,
        user_id: Uuid,
        title: &str,
        source_kind: SourceKind,
        source_url: Option<&str>,
        file_path: Option<&str>,
    ) -> Result<Material, AppError> {
        self.create(user_id, title, source_kind, source_url, file_path)
            .await
    }

    async fn get(&self, user_id: Uuid, id: Uuid) -> Result<Option<Material>, AppError> {
        self.get(user_id, id).await
    }

    async fn list(&self, user_id: Uuid) -> Result<Vec<Material>, AppError> {
        self.list(user_id).await
    }

    async fn begin_processing(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Material>, AppError> {
        self.begin_processing(user_id, id).await
    }

    async fn release_claim(&self, id: Uuid, status: MaterialStatus) -> Result<(), AppError> {
        self.release_claim(id, status).await
    }

    async fn complete_ingestion(
        &self,
        id: Uuid,
        extracted_text: &str,
        cards: &[FlashcardDraft],
    ) -> Result<bool, AppError> {
        self.complete_ingestion(id, extracted_text, cards).await
    }

    async fn mark_failed(&self, id: Uuid) -> Result<bool, AppError> {
        self.mark_failed(id).await
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        self.delete(user_id, id).await
    }
}

#[async_trait]
impl FlashcardStore for FlashcardRepository {
    async fn get(&self, user_id: Uuid, id: Uuid) -> Result<Option<Flashcard>, AppError> {
        self.get(user_id, id).await
    }

    async fn list(
        &self,
        user_id: Uuid,
        material_id: Option<Uuid>,
    ) -> Result<Vec<Flashcard>, AppError> {
        self.list(user_id, material_id).await
    }

    async fn due_for_review(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Flashcard>, AppError> {
        self.due_for_review(user_id, now, limit).await
    }

    async fn apply_review(
        &self,
        user_id: Uuid,
        id: Uuid,
        expected_stage: LearningStage,
        new_stage: LearningStage,
        next_review_at: DateTime<Utc>,
    ) -> Result<Option<Flashcard>, AppError> {
        self.apply_review(user_id, id, expected_stage, new_stage, next_review_at)
            .await
    }

    async fn stats(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<ReviewStats, AppError> {
        self.stats(user_id, now).await
    }
}

#[async_trait]
impl QuizStore for QuizRepository {
    async fn create(
        &self,
        user_id: Uuid,
        material_id: Uuid,
        questions: &[QuizQuestion],
    ) -> Result<Quiz, AppError> {
        self.create(user_id, material_id, questions).await
    }

    async fn get(&self, user_id: Uuid, id: Uuid) -> Result<Option<Quiz>, AppError> {
        self.get(user_id, id).await
    }

    async fn list(
        &self,
        user_id: Uuid,
        material_id: Option<Uuid>,
    ) -> Result<Vec<Quiz>, AppError> {
        self.list(user_id, material_id).await
    }

    async fn count_for_material(
        &self,
        user_id: Uuid,
        material_id: Uuid,
    ) -> Result<i64, AppError> {
        self.count_for_material(user_id, material_id).await
    }

    async fn record_submission(
        &self,
        user_id: Uuid,
        id: Uuid,
        score: i32,
        completed_at: DateTime<Utc>,
    ) -> Result<Option<Quiz>, AppError> {
        self.record_submission(user_id, id, score, completed_at).await
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        self.delete(user_id, id).await
    }
}

#[async_trait]
impl ChatStore for ChatRepository {
    async fn append(
        &self,
        user_id: Uuid,
        material_id: Uuid,
        role: ChatRole,
        content: &str,
    ) -> Result<ChatMessage, AppError> {
        self.append(user_id, material_id, role, content).await
    }

    async fn list_for_material(
        &self,
        user_id: Uuid,
        material_id: Uuid,
    ) -> Result<Vec<ChatMessage>, AppError> {
        self.list_for_material(user_id, material_id).await
    }

    async fn delete_message(&self, id: Uuid) -> Result<bool, AppError> {
        self.delete_message(id).await
    }

    async fn clear_for_material(
        &self,
        user_id: Uuid,
        material_id: Uuid,
    ) -> Result<u64, AppError> {
        self.clear_for_material(user_id, material_id).await
    }
}

#[async_trait]
impl SubscriptionStore for SubscriptionRepository {
    async fn get(&self, user_id: Uuid) -> Result<Option<Subscription>, AppError> {
        self.get(user_id).await
    }

    async fn get_or_create(
        &self,
        user_id: Uuid,
        trial_end: DateTime<Utc>,
    ) -> Result<Subscription, AppError> {
        self.get_or_create(user_id, trial_end).await
    }

    async fn reserve_upload(
        &self,
        user_id: Uuid,
        limit: i32,
    ) -> Result<UploadReservation, AppError> {
        self.reserve_upload(user_id, limit).await
    }

    async fn persist_window_roll(
        &self,
        subscription: &Subscription,
        used: i32,
        reset_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        self.persist_window_roll(subscription, used, reset_at).await
    }

    async fn set_cancel_at_period_end(
        &self,
        user_id: Uuid,
        cancel: bool,
    ) -> Result<Option<Subscription>, AppError> {
        self.set_cancel_at_period_end(user_id, cancel).await
    }

    async fn ensure_billing_customer(
        &self,
        user_id: Uuid,
        customer_id: &str,
    ) -> Result<Option<Subscription>, AppError> {
        self.ensure_billing_customer(user_id, customer_id).await
    }
}
