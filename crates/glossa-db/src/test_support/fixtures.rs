//! Test fixtures and helper functions for creating test data

use chrono::{Duration, Utc};
use uuid::Uuid;

use glossa_core::models::{
    Flashcard, FlashcardDraft, LearningStage, Material, MaterialStatus, PlanTier, QuestionKind,
    Quiz, QuizOption, QuizQuestion, SourceKind, Subscription, SubscriptionStatus,
};

/// Create a test Material in the given status
pub fn create_test_material(user_id: Uuid, status: MaterialStatus) -> Material {
    let now = Utc::now();
    Material {
        id: Uuid::new_v4(),
        user_id,
        title: "Spanish short stories".to_string(),
        source_kind: SourceKind::File,
        source_url: None,
        file_path: Some("uploads/spanish_short_stories.pdf".to_string()),
        extracted_text: match status {
            MaterialStatus::Completed => Some("El gato duerme en el sol.".to_string()),
            _ => None,
        },
        status,
        created_at: now,
        updated_at: now,
    }
}

/// Create a test Flashcard that is already due for review
pub fn create_test_flashcard(user_id: Uuid, material_id: Uuid, stage: LearningStage) -> Flashcard {
    let now = Utc::now();
    Flashcard {
        id: Uuid::new_v4(),
        material_id,
        user_id,
        term: "el gato".to_string(),
        translation: "the cat".to_string(),
        definition: Some("A small domesticated feline".to_string()),
        context_snippet: Some("El gato duerme en el sol.".to_string()),
        grammar_note: Some("Masculine noun".to_string()),
        stage,
        next_review_at: now - Duration::minutes(5),
        created_at: now - Duration::days(1),
        updated_at: now - Duration::days(1),
    }
}

/// Create a test Subscription in the given status
///
/// Trialing subscriptions get a running trial; paid statuses get a period
/// ending in 30 days. The quota window is fresh.
pub fn create_test_subscription(user_id: Uuid, status: SubscriptionStatus) -> Subscription {
    let now = Utc::now();
    let (tier, trial_end, current_period_end) = match status {
        SubscriptionStatus::Free => (PlanTier::Free, None, None),
        SubscriptionStatus::Trialing => (PlanTier::Pro, Some(now + Duration::days(7)), None),
        _ => (PlanTier::Pro, None, Some(now + Duration::days(30))),
    };
    Subscription {
        user_id,
        status,
        tier,
        trial_end,
        current_period_end,
        cancel_at_period_end: false,
        uploads_this_week: 0,
        week_reset_at: now + Duration::days(7),
        billing_customer_id: None,
        billing_subscription_id: None,
        created_at: now,
        updated_at: now,
    }
}

/// Create `count` test quiz questions cycling through the question kinds.
/// Question `i` has correct answer `"answer {i}"`.
pub fn create_test_questions(count: usize) -> Vec<QuizQuestion> {
    (0..count)
        .map(|i| {
            let correct = format!("answer {}", i);
            let kind = match i % 3 {
                0 => QuestionKind::MultipleChoice,
                1 => QuestionKind::TrueFalse,
                _ => QuestionKind::FillBlank,
            };
            let options = match kind {
                QuestionKind::MultipleChoice => vec![
                    QuizOption {
                        text: correct.clone(),
                        is_correct: true,
                    },
                    QuizOption {
                        text: format!("wrong {}", i),
                        is_correct: false,
                    },
                ],
                _ => Vec::new(),
            };
            QuizQuestion {
                prompt: format!("Question {}?", i),
                kind,
                options,
                correct_answer: correct,
                explanation: format!("Because of rule {}", i),
            }
        })
        .collect()
}

/// Create a test Quiz that has not been submitted yet
pub fn create_test_quiz(user_id: Uuid, material_id: Uuid, question_count: usize) -> Quiz {
    let questions = create_test_questions(question_count);
    Quiz {
        id: Uuid::new_v4(),
        material_id,
        user_id,
        total_questions: questions.len() as i32,
        questions,
        score: None,
        completed_at: None,
        created_at: Utc::now(),
    }
}

/// Create `count` flashcard drafts as a collaborator would return them
pub fn create_test_drafts(count: usize) -> Vec<FlashcardDraft> {
    (0..count)
        .map(|i| FlashcardDraft {
            term: format!("palabra {}", i),
            translation: format!("word {}", i),
            definition: Some(format!("Definition {}", i)),
            context_snippet: Some(format!("Context sentence {}.", i)),
            grammar_note: None,
        })
        .collect()
}
