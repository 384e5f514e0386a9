//! Scripted generator for service tests

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use glossa_core::error::AppError;
use glossa_core::models::{ChatMessage, FlashcardDraft, QuestionKind, QuizOption, QuizQuestion};

use crate::{ContentGenerator, ExtractionOutput, ExtractionRequest, ExtractionSource};

/// In-memory generator returning scripted output, with an optional failure
/// toggle for exercising error paths.
pub struct MockGenerator {
    drafts: Mutex<Vec<FlashcardDraft>>,
    questions: Mutex<Vec<QuizQuestion>>,
    reply: Mutex<String>,
    failure: Mutex<Option<String>>,
    extract_calls: AtomicUsize,
    quiz_calls: AtomicUsize,
    chat_calls: AtomicUsize,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self {
            drafts: Mutex::new(vec![
                FlashcardDraft {
                    term: "el gato".to_string(),
                    translation: "the cat".to_string(),
                    definition: Some("A small domesticated feline".to_string()),
                    context_snippet: Some("El gato duerme en el sofá.".to_string()),
                    grammar_note: Some("Masculine noun".to_string()),
                },
                FlashcardDraft {
                    term: "dormir".to_string(),
                    translation: "to sleep".to_string(),
                    definition: None,
                    context_snippet: None,
                    grammar_note: Some("Stem-changing verb, o to ue".to_string()),
                },
            ]),
            questions: Mutex::new(Vec::new()),
            reply: Mutex::new("\"El gato\" means \"the cat\".".to_string()),
            failure: Mutex::new(None),
            extract_calls: AtomicUsize::new(0),
            quiz_calls: AtomicUsize::new(0),
            chat_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_drafts(&self, drafts: Vec<FlashcardDraft>) {
        *self.drafts.lock().unwrap() = drafts;
    }

    pub fn set_questions(&self, questions: Vec<QuizQuestion>) {
        *self.questions.lock().unwrap() = questions;
    }

    pub fn set_reply(&self, reply: &str) {
        *self.reply.lock().unwrap() = reply.to_string();
    }

    /// Make every generation call fail with the given message.
    pub fn set_failure(&self, message: &str) {
        *self.failure.lock().unwrap() = Some(message.to_string());
    }

    pub fn clear_failure(&self) {
        *self.failure.lock().unwrap() = None;
    }

    pub fn extract_call_count(&self) -> usize {
        self.extract_calls.load(Ordering::SeqCst)
    }

    pub fn quiz_call_count(&self) -> usize {
        self.quiz_calls.load(Ordering::SeqCst)
    }

    pub fn chat_call_count(&self) -> usize {
        self.chat_calls.load(Ordering::SeqCst)
    }

    fn check_failure(&self) -> Result<(), AppError> {
        if let Some(message) = self.failure.lock().unwrap().as_ref() {
            return Err(AppError::GenerationFailed(message.clone()));
        }
        Ok(())
    }

    /// Build `count` simple questions cycling through the three kinds.
    fn scripted_questions(count: usize) -> Vec<QuizQuestion> {
        (0..count)
            .map(|i| match i % 3 {
                0 => QuizQuestion {
                    prompt: format!("What does term {} mean?", i),
                    kind: QuestionKind::MultipleChoice,
                    options: vec![
                        QuizOption {
                            text: format!("meaning {}", i),
                            is_correct: true,
                        },
                        QuizOption {
                            text: "something else".to_string(),
                            is_correct: false,
                        },
                    ],
                    correct_answer: format!("meaning {}", i),
                    explanation: format!("Term {} translates directly.", i),
                },
                1 => QuizQuestion {
                    prompt: format!("Statement {} is about the text.", i),
                    kind: QuestionKind::TrueFalse,
                    options: Vec::new(),
                    correct_answer: "true".to_string(),
                    explanation: "Stated directly in the text.".to_string(),
                },
                _ => QuizQuestion {
                    prompt: format!("Fill in blank {}: el ___ duerme.", i),
                    kind: QuestionKind::FillBlank,
                    options: Vec::new(),
                    correct_answer: "gato".to_string(),
                    explanation: "The text names the cat as the sleeper.".to_string(),
                },
            })
            .collect()
    }
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentGenerator for MockGenerator {
    async fn extract_flashcards(
        &self,
        request: &ExtractionRequest,
    ) -> Result<ExtractionOutput, AppError> {
        self.extract_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure()?;

        let text = match &request.source {
            ExtractionSource::Text(text) => text.clone(),
            ExtractionSource::Url { url, .. } => format!("Transcript fetched from {}", url),
        };

        Ok(ExtractionOutput {
            text,
            cards: self.drafts.lock().unwrap().clone(),
        })
    }

    async fn generate_quiz(
        &self,
        _source_text: &str,
        num_questions: usize,
    ) -> Result<Vec<QuizQuestion>, AppError> {
        self.quiz_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure()?;

        let scripted = self.questions.lock().unwrap().clone();
        if scripted.is_empty() {
            Ok(Self::scripted_questions(num_questions))
        } else {
            Ok(scripted)
        }
    }

    async fn chat_reply(
        &self,
        _source_text: &str,
        _history: &[ChatMessage],
        _message: &str,
    ) -> Result<String, AppError> {
        self.chat_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure()?;
        Ok(self.reply.lock().unwrap().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_returns_scripted_drafts() {
        let generator = MockGenerator::new();
        let output = generator
            .extract_flashcards(&ExtractionRequest {
                title: "Cuentos".to_string(),
                source: ExtractionSource::Text("El gato duerme.".to_string()),
            })
            .await
            .unwrap();

        assert_eq!(output.text, "El gato duerme.");
        assert_eq!(output.cards.len(), 2);
        assert_eq!(generator.extract_call_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_failure_toggle() {
        let generator = MockGenerator::new();
        generator.set_failure("model unavailable");

        let result = generator.generate_quiz("texto", 5).await;
        assert!(matches!(result, Err(AppError::GenerationFailed(_))));

        generator.clear_failure();
        let questions = generator.generate_quiz("texto", 5).await.unwrap();
        assert_eq!(questions.len(), 5);
        assert_eq!(generator.quiz_call_count(), 2);
    }
}
