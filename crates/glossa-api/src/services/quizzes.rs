//! Quiz generation, grading, and the per-material quiz quota.
//!
//! Generation only runs against a completed material and never writes a row
//! unless the generator produced a full question set. A quiz is graded at
//! most once; the first submission freezes score and completion time.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use glossa_core::entitlements::resolve;
use glossa_core::models::{MaterialStatus, Quiz, QuizSubmissionResult};
use glossa_core::scoring::grade_submission;
use glossa_core::{AppError, Config};
use glossa_db::stores::{MaterialStore, QuizStore, SubscriptionStore};

use glossa_ai::ContentGenerator;

/// Question-count bounds per quiz. Requests outside the range are clamped,
/// not rejected.
const DEFAULT_NUM_QUESTIONS: usize = 5;
const MIN_NUM_QUESTIONS: usize = 1;
const MAX_NUM_QUESTIONS: usize = 20;

#[derive(Clone)]
pub struct QuizService {
    quizzes: Arc<dyn QuizStore>,
    materials: Arc<dyn MaterialStore>,
    subscriptions: Arc<dyn SubscriptionStore>,
    generator: Arc<dyn ContentGenerator>,
    config: Config,
}

impl QuizService {
    pub fn new(
        quizzes: Arc<dyn QuizStore>,
        materials: Arc<dyn MaterialStore>,
        subscriptions: Arc<dyn SubscriptionStore>,
        generator: Arc<dyn ContentGenerator>,
        config: Config,
    ) -> Self {
        Self {
            quizzes,
            materials,
            subscriptions,
            generator,
            config,
        }
    }

    /// Generate a quiz from a material's extracted text.
    pub async fn generate(
        &self,
        user_id: Uuid,
        material_id: Uuid,
        num_questions: Option<usize>,
    ) -> Result<Quiz, AppError> {
        let material = self
            .materials
            .get(user_id, material_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Material not found".to_string()))?;
        if material.status != MaterialStatus::Completed {
            return Err(AppError::InvalidTransition {
                state: material.status.to_string(),
                operation: "generate quiz".to_string(),
            });
        }
        let source_text = material.extracted_text.as_deref().ok_or_else(|| {
            AppError::Internal("Completed material has no extracted text".to_string())
        })?;

        self.check_quiz_quota(user_id, material_id).await?;

        let num_questions = num_questions
            .unwrap_or(DEFAULT_NUM_QUESTIONS)
            .clamp(MIN_NUM_QUESTIONS, MAX_NUM_QUESTIONS);
        let questions = self
            .generator
            .generate_quiz(source_text, num_questions)
            .await?;
        if questions.is_empty() {
            return Err(AppError::GenerationFailed(
                "Generator returned no questions".to_string(),
            ));
        }

        let quiz = self.quizzes.create(user_id, material_id, &questions).await?;
        tracing::info!(
            quiz_id = %quiz.id,
            material_id = %material_id,
            question_count = quiz.total_questions,
            "Quiz generated"
        );
        Ok(quiz)
    }

    pub async fn get(&self, user_id: Uuid, quiz_id: Uuid) -> Result<Quiz, AppError> {
        self.quizzes
            .get(user_id, quiz_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Quiz not found".to_string()))
    }

    /// All quizzes for one material, newest first per the store ordering.
    pub async fn list_for_material(
        &self,
        user_id: Uuid,
        material_id: Uuid,
    ) -> Result<Vec<Quiz>, AppError> {
        self.materials
            .get(user_id, material_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Material not found".to_string()))?;
        self.quizzes.list(user_id, Some(material_id)).await
    }

    /// Grade a submission. First write wins; a concurrent duplicate loses the
    /// conditional update and reports `AlreadySubmitted`.
    pub async fn submit(
        &self,
        user_id: Uuid,
        quiz_id: Uuid,
        answers: &[String],
    ) -> Result<QuizSubmissionResult, AppError> {
        let quiz = self.get(user_id, quiz_id).await?;
        if quiz.is_completed() {
            return Err(AppError::AlreadySubmitted);
        }

        let (score, results) = grade_submission(&quiz.questions, answers)?;

        let recorded = self
            .quizzes
            .record_submission(user_id, quiz_id, score, Utc::now())
            .await?
            .ok_or(AppError::AlreadySubmitted)?;

        tracing::info!(
            quiz_id = %quiz_id,
            score,
            total = recorded.total_questions,
            "Quiz submitted"
        );
        Ok(QuizSubmissionResult {
            quiz_id,
            score,
            total_questions: recorded.total_questions,
            results,
        })
    }

    pub async fn delete(&self, user_id: Uuid, quiz_id: Uuid) -> Result<(), AppError> {
        if !self.quizzes.delete(user_id, quiz_id).await? {
            return Err(AppError::NotFound("Quiz not found".to_string()));
        }
        Ok(())
    }

    /// Enforce the per-material quiz limit for the user's current plan.
    async fn check_quiz_quota(&self, user_id: Uuid, material_id: Uuid) -> Result<(), AppError> {
        let now = Utc::now();
        let trial_end = now + chrono::Duration::days(self.config.trial_days());
        let subscription = self.subscriptions.get_or_create(user_id, trial_end).await?;
        let entitlements = resolve(&subscription, now);

        let existing = self
            .quizzes
            .count_for_material(user_id, material_id)
            .await?;
        if existing >= i64::from(entitlements.quiz_limit_per_material) {
            return Err(AppError::QuotaExceeded {
                resource: "quizzes for this material".to_string(),
                used: existing,
                limit: i64::from(entitlements.quiz_limit_per_material),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glossa_core::models::{MaterialStatus, SubscriptionStatus};
    use glossa_db::test_support::fixtures::{
        create_test_material, create_test_quiz, create_test_subscription,
    };
    use glossa_db::test_support::mock_stores::{
        MockMaterialStore, MockQuizStore, MockSubscriptionStore,
    };
    use glossa_ai::MockGenerator;

    use crate::services::test_config;

    struct Harness {
        service: QuizService,
        quizzes: MockQuizStore,
        materials: MockMaterialStore,
        subscriptions: MockSubscriptionStore,
        generator: Arc<MockGenerator>,
    }

    fn harness() -> Harness {
        let quizzes = MockQuizStore::new();
        let materials = MockMaterialStore::new();
        let subscriptions = MockSubscriptionStore::new();
        let generator = Arc::new(MockGenerator::new());
        let service = QuizService::new(
            Arc::new(quizzes.clone()),
            Arc::new(materials.clone()),
            Arc::new(subscriptions.clone()),
            generator.clone(),
            test_config(),
        );
        Harness {
            service,
            quizzes,
            materials,
            subscriptions,
            generator,
        }
    }

    #[tokio::test]
    async fn test_generate_defaults_to_five_questions() {
        let h = harness();
        let user_id = Uuid::new_v4();
        let material = create_test_material(user_id, MaterialStatus::Completed);
        let material_id = material.id;
        h.materials.add_material(material);

        let quiz = h
            .service
            .generate(user_id, material_id, None)
            .await
            .unwrap();

        assert_eq!(quiz.total_questions, 5);
        assert_eq!(quiz.material_id, material_id);
        assert!(quiz.score.is_none());
        assert_eq!(h.generator.quiz_call_count(), 1);
    }

    #[tokio::test]
    async fn test_generate_clamps_question_count() {
        let h = harness();
        let user_id = Uuid::new_v4();
        let material = create_test_material(user_id, MaterialStatus::Completed);
        let material_id = material.id;
        h.materials.add_material(material);

        let quiz = h
            .service
            .generate(user_id, material_id, Some(500))
            .await
            .unwrap();

        assert_eq!(quiz.total_questions, 20);
    }

    #[tokio::test]
    async fn test_generate_rejects_unprocessed_material() {
        let h = harness();
        let user_id = Uuid::new_v4();
        let material = create_test_material(user_id, MaterialStatus::Pending);
        let material_id = material.id;
        h.materials.add_material(material);

        let err = h
            .service
            .generate(user_id, material_id, None)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::InvalidTransition { .. }));
        assert_eq!(h.generator.quiz_call_count(), 0);
    }

    #[tokio::test]
    async fn test_generate_enforces_per_material_limit() {
        let h = harness();
        let user_id = Uuid::new_v4();
        let material = create_test_material(user_id, MaterialStatus::Completed);
        let material_id = material.id;
        h.materials.add_material(material);
        // Free plan: 3 quizzes per material
        h.subscriptions
            .add_subscription(create_test_subscription(user_id, SubscriptionStatus::Free));
        for _ in 0..3 {
            h.quizzes.add_quiz(create_test_quiz(user_id, material_id, 5));
        }

        let err = h
            .service
            .generate(user_id, material_id, None)
            .await
            .unwrap_err();

        match err {
            AppError::QuotaExceeded { used, limit, .. } => {
                assert_eq!(used, 3);
                assert_eq!(limit, 3);
            }
            other => panic!("Expected QuotaExceeded, got {:?}", other),
        }
        assert_eq!(h.generator.quiz_call_count(), 0);
    }

    #[tokio::test]
    async fn test_quota_is_per_material_not_global() {
        let h = harness();
        let user_id = Uuid::new_v4();
        h.subscriptions
            .add_subscription(create_test_subscription(user_id, SubscriptionStatus::Free));

        let exhausted = create_test_material(user_id, MaterialStatus::Completed);
        for _ in 0..3 {
            h.quizzes.add_quiz(create_test_quiz(user_id, exhausted.id, 5));
        }
        h.materials.add_material(exhausted);

        let fresh = create_test_material(user_id, MaterialStatus::Completed);
        let fresh_id = fresh.id;
        h.materials.add_material(fresh);

        assert!(h.service.generate(user_id, fresh_id, None).await.is_ok());
    }

    #[tokio::test]
    async fn test_generation_failure_persists_nothing() {
        let h = harness();
        let user_id = Uuid::new_v4();
        let material = create_test_material(user_id, MaterialStatus::Completed);
        let material_id = material.id;
        h.materials.add_material(material);
        h.generator.set_failure("model overloaded");

        let err = h
            .service
            .generate(user_id, material_id, None)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::GenerationFailed(_)));
        let quizzes = h.quizzes.list(user_id, Some(material_id)).await.unwrap();
        assert!(quizzes.is_empty());
    }

    #[tokio::test]
    async fn test_submit_grades_case_insensitively() {
        let h = harness();
        let user_id = Uuid::new_v4();
        let quiz = create_test_quiz(user_id, Uuid::new_v4(), 3);
        let quiz_id = quiz.id;
        h.quizzes.add_quiz(quiz);

        // Correct answers are "answer 0".."answer 2"; vary case and padding
        let answers = vec![
            "  ANSWER 0 ".to_string(),
            "wrong".to_string(),
            "Answer 2".to_string(),
        ];
        let result = h.service.submit(user_id, quiz_id, &answers).await.unwrap();

        assert_eq!(result.score, 2);
        assert_eq!(result.total_questions, 3);
        assert_eq!(result.results.len(), 3);
        assert!(result.results[0].is_correct);
        assert!(!result.results[1].is_correct);
        assert_eq!(result.results[1].correct_answer, "answer 1");
    }

    #[tokio::test]
    async fn test_submit_rejects_wrong_answer_count() {
        let h = harness();
        let user_id = Uuid::new_v4();
        let quiz = create_test_quiz(user_id, Uuid::new_v4(), 5);
        let quiz_id = quiz.id;
        h.quizzes.add_quiz(quiz);

        let err = h
            .service
            .submit(user_id, quiz_id, &["only one".to_string()])
            .await
            .unwrap_err();

        match err {
            AppError::InvalidAnswerCount { expected, received } => {
                assert_eq!(expected, 5);
                assert_eq!(received, 1);
            }
            other => panic!("Expected InvalidAnswerCount, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_second_submission_is_rejected() {
        let h = harness();
        let user_id = Uuid::new_v4();
        let quiz = create_test_quiz(user_id, Uuid::new_v4(), 2);
        let quiz_id = quiz.id;
        h.quizzes.add_quiz(quiz);

        let answers = vec!["answer 0".to_string(), "answer 1".to_string()];
        let first = h.service.submit(user_id, quiz_id, &answers).await.unwrap();
        assert_eq!(first.score, 2);

        let err = h
            .service
            .submit(user_id, quiz_id, &answers)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AlreadySubmitted));

        // Score frozen at the first result
        let stored = h.service.get(user_id, quiz_id).await.unwrap();
        assert_eq!(stored.score, Some(2));
    }

    #[tokio::test]
    async fn test_list_requires_owned_material() {
        let h = harness();
        let user_id = Uuid::new_v4();
        let material = create_test_material(Uuid::new_v4(), MaterialStatus::Completed);
        let material_id = material.id;
        h.materials.add_material(material);

        let err = h
            .service
            .list_for_material(user_id, material_id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_scoped_to_owner() {
        let h = harness();
        let owner = Uuid::new_v4();
        let quiz = create_test_quiz(owner, Uuid::new_v4(), 3);
        let quiz_id = quiz.id;
        h.quizzes.add_quiz(quiz);

        let err = h
            .service
            .delete(Uuid::new_v4(), quiz_id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        h.service.delete(owner, quiz_id).await.unwrap();
        assert!(h.service.get(owner, quiz_id).await.is_err());
    }
}
