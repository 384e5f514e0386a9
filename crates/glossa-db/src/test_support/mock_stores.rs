//! Mock store implementations for testing without a database
//!
//! Each mock keeps rows in a `HashMap` behind a mutex and reproduces the
//! conditional-write semantics of the SQL repositories: claims, review
//! stage compare-and-set, first-submission-wins and the quota window all
//! behave as they do against Postgres.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use glossa_core::entitlements::roll_week;
use glossa_core::error::AppError;
use glossa_core::models::{
    ChatMessage, ChatRole, Flashcard, FlashcardDraft, LearningStage, Material, MaterialStatus,
    PlanTier, Quiz, QuizQuestion, ReviewStats, SourceKind, Subscription, SubscriptionStatus,
};

use crate::stores::{
    ChatStore, FlashcardStore, MaterialStore, QuizStore, SubscriptionStore, UploadReservation,
};

type CardMap = Arc<Mutex<HashMap<Uuid, Flashcard>>>;

/// Mock material store. Shares its flashcard map with a
/// [`MockFlashcardStore`] when built via [`MockMaterialStore::sharing_cards_with`],
/// so ingestion completion lands where the card store reads.
#[derive(Clone)]
pub struct MockMaterialStore {
    materials: Arc<Mutex<HashMap<Uuid, Material>>>,
    cards: CardMap,
}

impl MockMaterialStore {
    pub fn new() -> Self {
        Self {
            materials: Arc::new(Mutex::new(HashMap::new())),
            cards: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn sharing_cards_with(card_store: &MockFlashcardStore) -> Self {
        Self {
            materials: Arc::new(Mutex::new(HashMap::new())),
            cards: card_store.cards.clone(),
        }
    }

    pub fn add_material(&self, material: Material) {
        self.materials
            .lock()
            .unwrap()
            .insert(material.id, material);
    }

    /// Current status, bypassing ownership checks (test assertions only).
    pub fn status_of(&self, id: Uuid) -> Option<MaterialStatus> {
        self.materials.lock().unwrap().get(&id).map(|m| m.status)
    }
}

impl Default for MockMaterialStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MaterialStore for MockMaterialStore {
    async fn create(
        &self,
        user_id: Uuid,
        title: &str,
        source_kind: SourceKind,
        source_url: Option<&str>,
        file_path: Option<&str>,
    ) -> Result<Material, AppError> {
        let now = Utc::now();
        let material = Material {
            id: Uuid::new_v4(),
            user_id,
            title: title.to_string(),
            source_kind,
            source_url: source_url.map(str::to_string),
            file_path: file_path.map(str::to_string),
            extracted_text: None,
            status: MaterialStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        self.materials
            .lock()
            .unwrap()
            .insert(material.id, material.clone());
        Ok(material)
    }

    async fn get(&self, user_id: Uuid, id: Uuid) -> Result<Option<Material>, AppError> {
        Ok(self
            .materials
            .lock()
            .unwrap()
            .get(&id)
            .filter(|m| m.user_id == user_id)
            .cloned())
    }

    async fn list(&self, user_id: Uuid) -> Result<Vec<Material>, AppError> {
        let mut materials: Vec<Material> = self
            .materials
            .lock()
            .unwrap()
            .values()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect();
        materials.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(materials)
    }

    async fn begin_processing(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Material>, AppError> {
        let mut materials = self.materials.lock().unwrap();
        match materials.get_mut(&id) {
            Some(m) if m.user_id == user_id && m.status.can_start_ingestion() => {
                m.status = MaterialStatus::Processing;
                m.updated_at = Utc::now();
                Ok(Some(m.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn release_claim(&self, id: Uuid, status: MaterialStatus) -> Result<(), AppError> {
        let mut materials = self.materials.lock().unwrap();
        if let Some(m) = materials.get_mut(&id) {
            if m.status == MaterialStatus::Processing {
                m.status = status;
                m.updated_at = Utc::now();
            }
        }
        Ok(())
    }

    async fn complete_ingestion(
        &self,
        id: Uuid,
        extracted_text: &str,
        drafts: &[FlashcardDraft],
    ) -> Result<bool, AppError> {
        let mut materials = self.materials.lock().unwrap();
        let Some(m) = materials.get_mut(&id) else {
            return Ok(false);
        };
        if m.status != MaterialStatus::Processing {
            return Ok(false);
        }
        m.status = MaterialStatus::Completed;
        m.extracted_text = Some(extracted_text.to_string());
        m.updated_at = Utc::now();
        let user_id = m.user_id;
        drop(materials);

        let mut cards = self.cards.lock().unwrap();
        cards.retain(|_, c| c.material_id != id);
        let now = Utc::now();
        for draft in drafts {
            let card = Flashcard {
                id: Uuid::new_v4(),
                material_id: id,
                user_id,
                term: draft.term.clone(),
                translation: draft.translation.clone(),
                definition: draft.definition.clone(),
                context_snippet: draft.context_snippet.clone(),
                grammar_note: draft.grammar_note.clone(),
                stage: LearningStage::New,
                next_review_at: now,
                created_at: now,
                updated_at: now,
            };
            cards.insert(card.id, card);
        }
        Ok(true)
    }

    async fn mark_failed(&self, id: Uuid) -> Result<bool, AppError> {
        let mut materials = self.materials.lock().unwrap();
        match materials.get_mut(&id) {
            Some(m) if m.status == MaterialStatus::Processing => {
                m.status = MaterialStatus::Failed;
                m.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let removed = {
            let mut materials = self.materials.lock().unwrap();
            match materials.get(&id) {
                Some(m) if m.user_id == user_id => {
                    materials.remove(&id);
                    true
                }
                _ => false,
            }
        };
        if removed {
            self.cards.lock().unwrap().retain(|_, c| c.material_id != id);
        }
        Ok(removed)
    }
}

/// Mock flashcard store backed by the same map the material store writes.
#[derive(Clone)]
pub struct MockFlashcardStore {
    cards: CardMap,
}

impl MockFlashcardStore {
    pub fn new() -> Self {
        Self {
            cards: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn add_card(&self, card: Flashcard) {
        self.cards.lock().unwrap().insert(card.id, card);
    }

    pub fn card_count(&self) -> usize {
        self.cards.lock().unwrap().len()
    }
}

impl Default for MockFlashcardStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FlashcardStore for MockFlashcardStore {
    async fn get(&self, user_id: Uuid, id: Uuid) -> Result<Option<Flashcard>, AppError> {
        Ok(self
            .cards
            .lock()
            .unwrap()
            .get(&id)
            .filter(|c| c.user_id == user_id)
            .cloned())
    }

    async fn list(
        &self,
        user_id: Uuid,
        material_id: Option<Uuid>,
    ) -> Result<Vec<Flashcard>, AppError> {
        let mut cards: Vec<Flashcard> = self
            .cards
            .lock()
            .unwrap()
            .values()
            .filter(|c| c.user_id == user_id)
            .filter(|c| material_id.map_or(true, |mid| c.material_id == mid))
            .cloned()
            .collect();
        cards.sort_by_key(|c| c.created_at);
        Ok(cards)
    }

    async fn due_for_review(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Flashcard>, AppError> {
        let mut cards: Vec<Flashcard> = self
            .cards
            .lock()
            .unwrap()
            .values()
            .filter(|c| c.user_id == user_id && c.next_review_at <= now)
            .cloned()
            .collect();
        cards.sort_by_key(|c| c.next_review_at);
        cards.truncate(limit as usize);
        Ok(cards)
    }

    async fn apply_review(
        &self,
        user_id: Uuid,
        id: Uuid,
        expected_stage: LearningStage,
        new_stage: LearningStage,
        next_review_at: DateTime<Utc>,
    ) -> Result<Option<Flashcard>, AppError> {
        let mut cards = self.cards.lock().unwrap();
        match cards.get_mut(&id) {
            Some(c) if c.user_id == user_id && c.stage == expected_stage => {
                c.stage = new_stage;
                c.next_review_at = next_review_at;
                c.updated_at = Utc::now();
                Ok(Some(c.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn stats(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<ReviewStats, AppError> {
        let cards = self.cards.lock().unwrap();
        let mine: Vec<&Flashcard> = cards.values().filter(|c| c.user_id == user_id).collect();
        Ok(ReviewStats {
            total_cards: mine.len() as i64,
            due_for_review: mine.iter().filter(|c| c.next_review_at <= now).count() as i64,
            new_cards: mine
                .iter()
                .filter(|c| c.stage == LearningStage::New)
                .count() as i64,
            learning: mine
                .iter()
                .filter(|c| {
                    matches!(c.stage, LearningStage::Learning1 | LearningStage::Learning2)
                })
                .count() as i64,
            mastered: mine
                .iter()
                .filter(|c| c.stage == LearningStage::Mastered)
                .count() as i64,
        })
    }
}

/// Mock quiz store with first-submission-wins semantics.
#[derive(Clone)]
pub struct MockQuizStore {
    quizzes: Arc<Mutex<HashMap<Uuid, Quiz>>>,
}

impl MockQuizStore {
    pub fn new() -> Self {
        Self {
            quizzes: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn add_quiz(&self, quiz: Quiz) {
        self.quizzes.lock().unwrap().insert(quiz.id, quiz);
    }
}

impl Default for MockQuizStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QuizStore for MockQuizStore {
    async fn create(
        &self,
        user_id: Uuid,
        material_id: Uuid,
        questions: &[QuizQuestion],
    ) -> Result<Quiz, AppError> {
        let quiz = Quiz {
            id: Uuid::new_v4(),
            material_id,
            user_id,
            questions: questions.to_vec(),
            score: None,
            total_questions: questions.len() as i32,
            completed_at: None,
            created_at: Utc::now(),
        };
        self.quizzes.lock().unwrap().insert(quiz.id, quiz.clone());
        Ok(quiz)
    }

    async fn get(&self, user_id: Uuid, id: Uuid) -> Result<Option<Quiz>, AppError> {
        Ok(self
            .quizzes
            .lock()
            .unwrap()
            .get(&id)
            .filter(|q| q.user_id == user_id)
            .cloned())
    }

    async fn list(
        &self,
        user_id: Uuid,
        material_id: Option<Uuid>,
    ) -> Result<Vec<Quiz>, AppError> {
        let mut quizzes: Vec<Quiz> = self
            .quizzes
            .lock()
            .unwrap()
            .values()
            .filter(|q| q.user_id == user_id)
            .filter(|q| material_id.map_or(true, |mid| q.material_id == mid))
            .cloned()
            .collect();
        quizzes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(quizzes)
    }

    async fn count_for_material(
        &self,
        user_id: Uuid,
        material_id: Uuid,
    ) -> Result<i64, AppError> {
        Ok(self
            .quizzes
            .lock()
            .unwrap()
            .values()
            .filter(|q| q.user_id == user_id && q.material_id == material_id)
            .count() as i64)
    }

    async fn record_submission(
        &self,
        user_id: Uuid,
        id: Uuid,
        score: i32,
        completed_at: DateTime<Utc>,
    ) -> Result<Option<Quiz>, AppError> {
        let mut quizzes = self.quizzes.lock().unwrap();
        match quizzes.get_mut(&id) {
            Some(q) if q.user_id == user_id && q.completed_at.is_none() => {
                q.score = Some(score);
                q.completed_at = Some(completed_at);
                Ok(Some(q.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let mut quizzes = self.quizzes.lock().unwrap();
        match quizzes.get(&id) {
            Some(q) if q.user_id == user_id => {
                quizzes.remove(&id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

/// Mock chat store.
#[derive(Clone)]
pub struct MockChatStore {
    messages: Arc<Mutex<Vec<ChatMessage>>>,
}

impl MockChatStore {
    pub fn new() -> Self {
        Self {
            messages: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn message_count(&self) -> usize {
        self.messages.lock().unwrap().len()
    }
}

impl Default for MockChatStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatStore for MockChatStore {
    async fn append(
        &self,
        user_id: Uuid,
        material_id: Uuid,
        role: ChatRole,
        content: &str,
    ) -> Result<ChatMessage, AppError> {
        let message = ChatMessage {
            id: Uuid::new_v4(),
            material_id,
            user_id,
            role,
            content: content.to_string(),
            created_at: Utc::now(),
        };
        self.messages.lock().unwrap().push(message.clone());
        Ok(message)
    }

    async fn list_for_material(
        &self,
        user_id: Uuid,
        material_id: Uuid,
    ) -> Result<Vec<ChatMessage>, AppError> {
        Ok(self
            .messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.user_id == user_id && m.material_id == material_id)
            .cloned()
            .collect())
    }

    async fn delete_message(&self, id: Uuid) -> Result<bool, AppError> {
        let mut messages = self.messages.lock().unwrap();
        let before = messages.len();
        messages.retain(|m| m.id != id);
        Ok(messages.len() < before)
    }

    async fn clear_for_material(
        &self,
        user_id: Uuid,
        material_id: Uuid,
    ) -> Result<u64, AppError> {
        let mut messages = self.messages.lock().unwrap();
        let before = messages.len();
        messages.retain(|m| !(m.user_id == user_id && m.material_id == material_id));
        Ok((before - messages.len()) as u64)
    }
}

/// Mock subscription store reproducing the quota window semantics.
#[derive(Clone)]
pub struct MockSubscriptionStore {
    subscriptions: Arc<Mutex<HashMap<Uuid, Subscription>>>,
}

impl MockSubscriptionStore {
    pub fn new() -> Self {
        Self {
            subscriptions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn add_subscription(&self, subscription: Subscription) {
        self.subscriptions
            .lock()
            .unwrap()
            .insert(subscription.user_id, subscription);
    }

    pub fn uploads_this_week(&self, user_id: Uuid) -> Option<i32> {
        self.subscriptions
            .lock()
            .unwrap()
            .get(&user_id)
            .map(|s| s.uploads_this_week)
    }
}

impl Default for MockSubscriptionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SubscriptionStore for MockSubscriptionStore {
    async fn get(&self, user_id: Uuid) -> Result<Option<Subscription>, AppError> {
        Ok(self.subscriptions.lock().unwrap().get(&user_id).cloned())
    }

    async fn get_or_create(
        &self,
        user_id: Uuid,
        trial_end: DateTime<Utc>,
    ) -> Result<Subscription, AppError> {
        let mut subscriptions = self.subscriptions.lock().unwrap();
        let now = Utc::now();
        let subscription = subscriptions.entry(user_id).or_insert_with(|| Subscription {
            user_id,
            status: SubscriptionStatus::Trialing,
            tier: PlanTier::Pro,
            trial_end: Some(trial_end),
            current_period_end: None,
            cancel_at_period_end: false,
            uploads_this_week: 0,
            week_reset_at: now + Duration::days(7),
            billing_customer_id: None,
            billing_subscription_id: None,
            created_at: now,
            updated_at: now,
        });
        Ok(subscription.clone())
    }

    async fn reserve_upload(
        &self,
        user_id: Uuid,
        limit: i32,
    ) -> Result<UploadReservation, AppError> {
        let mut subscriptions = self.subscriptions.lock().unwrap();
        let subscription = subscriptions
            .get_mut(&user_id)
            .ok_or_else(|| AppError::NotFound("Subscription not found".to_string()))?;

        let now = Utc::now();
        let (used, reset_at) =
            roll_week(subscription.uploads_this_week, subscription.week_reset_at, now);

        if used >= limit {
            return Ok(UploadReservation::Denied { used });
        }

        subscription.uploads_this_week = used + 1;
        subscription.week_reset_at = reset_at;
        subscription.updated_at = now;
        Ok(UploadReservation::Granted(subscription.clone()))
    }

    async fn persist_window_roll(
        &self,
        subscription: &Subscription,
        used: i32,
        reset_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let mut subscriptions = self.subscriptions.lock().unwrap();
        if let Some(s) = subscriptions.get_mut(&subscription.user_id) {
            if s.uploads_this_week == subscription.uploads_this_week
                && s.week_reset_at == subscription.week_reset_at
            {
                s.uploads_this_week = used;
                s.week_reset_at = reset_at;
                s.updated_at = Utc::now();
            }
        }
        Ok(())
    }

    async fn set_cancel_at_period_end(
        &self,
        user_id: Uuid,
        cancel: bool,
    ) -> Result<Option<Subscription>, AppError> {
        let mut subscriptions = self.subscriptions.lock().unwrap();
        Ok(subscriptions.get_mut(&user_id).map(|s| {
            s.cancel_at_period_end = cancel;
            s.updated_at = Utc::now();
            s.clone()
        }))
    }

    async fn ensure_billing_customer(
        &self,
        user_id: Uuid,
        customer_id: &str,
    ) -> Result<Option<Subscription>, AppError> {
        let mut subscriptions = self.subscriptions.lock().unwrap();
        Ok(subscriptions.get_mut(&user_id).map(|s| {
            if s.billing_customer_id.is_none() {
                s.billing_customer_id = Some(customer_id.to_string());
            }
            s.updated_at = Utc::now();
            s.clone()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fixtures::*;

    #[tokio::test]
    async fn test_begin_processing_claims_only_once() {
        let store = MockMaterialStore::new();
        let user_id = Uuid::new_v4();
        let material = create_test_material(user_id, MaterialStatus::Pending);
        let id = material.id;
        store.add_material(material);

        let first = store.begin_processing(user_id, id).await.unwrap();
        assert_eq!(first.unwrap().status, MaterialStatus::Processing);

        // Second claim loses: the material is no longer claimable.
        let second = store.begin_processing(user_id, id).await.unwrap();
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn test_completion_suppressed_after_delete() {
        let cards = MockFlashcardStore::new();
        let store = MockMaterialStore::sharing_cards_with(&cards);
        let user_id = Uuid::new_v4();
        let material = create_test_material(user_id, MaterialStatus::Pending);
        let id = material.id;
        store.add_material(material);

        store.begin_processing(user_id, id).await.unwrap().unwrap();
        assert!(store.delete(user_id, id).await.unwrap());

        let landed = store
            .complete_ingestion(id, "texto", &create_test_drafts(3))
            .await
            .unwrap();
        assert!(!landed);
        assert_eq!(cards.card_count(), 0);
    }

    #[tokio::test]
    async fn test_completion_replaces_prior_cards() {
        let cards = MockFlashcardStore::new();
        let store = MockMaterialStore::sharing_cards_with(&cards);
        let user_id = Uuid::new_v4();
        let material = create_test_material(user_id, MaterialStatus::Failed);
        let id = material.id;
        store.add_material(material);
        cards.add_card(create_test_flashcard(user_id, id, LearningStage::Review1));

        store.begin_processing(user_id, id).await.unwrap().unwrap();
        assert!(store
            .complete_ingestion(id, "texto nuevo", &create_test_drafts(2))
            .await
            .unwrap());

        // The stale card is gone; only the fresh set remains, at stage 0.
        let listed = cards.list(user_id, Some(id)).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().all(|c| c.stage == LearningStage::New));
    }

    #[tokio::test]
    async fn test_apply_review_rejects_stale_stage() {
        let cards = MockFlashcardStore::new();
        let user_id = Uuid::new_v4();
        let card = create_test_flashcard(user_id, Uuid::new_v4(), LearningStage::Learning2);
        let id = card.id;
        cards.add_card(card);

        let gone = cards
            .apply_review(
                user_id,
                id,
                LearningStage::Learning1,
                LearningStage::Learning2,
                Utc::now(),
            )
            .await
            .unwrap();
        assert!(gone.is_none());

        let applied = cards
            .apply_review(
                user_id,
                id,
                LearningStage::Learning2,
                LearningStage::Review1,
                Utc::now(),
            )
            .await
            .unwrap();
        assert_eq!(applied.unwrap().stage, LearningStage::Review1);
    }

    #[tokio::test]
    async fn test_stats_learning_counts_only_stages_one_and_two() {
        let cards = MockFlashcardStore::new();
        let user_id = Uuid::new_v4();
        let material_id = Uuid::new_v4();
        for stage in [
            LearningStage::New,
            LearningStage::Learning1,
            LearningStage::Learning2,
            LearningStage::Review1,
            LearningStage::Review2,
            LearningStage::Mastered,
        ] {
            cards.add_card(create_test_flashcard(user_id, material_id, stage));
        }

        let stats = cards.stats(user_id, Utc::now()).await.unwrap();
        assert_eq!(stats.total_cards, 6);
        assert_eq!(stats.new_cards, 1);
        assert_eq!(stats.learning, 2);
        assert_eq!(stats.mastered, 1);
    }

    #[tokio::test]
    async fn test_record_submission_first_write_wins() {
        let store = MockQuizStore::new();
        let user_id = Uuid::new_v4();
        let quiz = create_test_quiz(user_id, Uuid::new_v4(), 5);
        let id = quiz.id;
        store.add_quiz(quiz);

        let first = store
            .record_submission(user_id, id, 4, Utc::now())
            .await
            .unwrap();
        assert_eq!(first.unwrap().score, Some(4));

        let second = store
            .record_submission(user_id, id, 1, Utc::now())
            .await
            .unwrap();
        assert!(second.is_none());
        assert_eq!(store.get(user_id, id).await.unwrap().unwrap().score, Some(4));
    }

    #[tokio::test]
    async fn test_reserve_upload_denies_at_limit() {
        let store = MockSubscriptionStore::new();
        let user_id = Uuid::new_v4();
        store.add_subscription(create_test_subscription(user_id, SubscriptionStatus::Free));

        assert!(matches!(
            store.reserve_upload(user_id, 1).await.unwrap(),
            UploadReservation::Granted(_)
        ));
        assert!(matches!(
            store.reserve_upload(user_id, 1).await.unwrap(),
            UploadReservation::Denied { used: 1 }
        ));
    }

    #[tokio::test]
    async fn test_reserve_upload_rolls_expired_window() {
        let store = MockSubscriptionStore::new();
        let user_id = Uuid::new_v4();
        let mut subscription = create_test_subscription(user_id, SubscriptionStatus::Free);
        subscription.uploads_this_week = 1;
        subscription.week_reset_at = Utc::now() - Duration::hours(1);
        store.add_subscription(subscription);

        // The window expired, so the counter resets before the check.
        let reserved = store.reserve_upload(user_id, 1).await.unwrap();
        match reserved {
            UploadReservation::Granted(s) => {
                assert_eq!(s.uploads_this_week, 1);
                assert!(s.week_reset_at > Utc::now());
            }
            UploadReservation::Denied { .. } => panic!("expected the rolled window to grant"),
        }
    }
}
