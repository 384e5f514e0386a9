//! Content-generation collaborator for the glossa engine
//!
//! The [`ContentGenerator`] trait is the seam between the services and
//! the model provider: ingestion asks it for flashcards, the quiz engine
//! for questions, chat for tutor replies. The production implementation
//! ([`AnthropicGenerator`]) talks to Anthropic's Messages API; tests use
//! the scripted [`mock::MockGenerator`].

use async_trait::async_trait;

use glossa_core::error::AppError;
use glossa_core::models::{ChatMessage, FlashcardDraft, QuizQuestion, SourceKind};

pub mod anthropic;
#[cfg(any(test, feature = "test-helpers"))]
pub mod mock;

pub use anthropic::AnthropicGenerator;
#[cfg(any(test, feature = "test-helpers"))]
pub use mock::MockGenerator;

/// What the ingestion pipeline hands to the collaborator.
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    pub title: String,
    pub source: ExtractionSource,
}

/// Where the study text comes from.
#[derive(Debug, Clone)]
pub enum ExtractionSource {
    /// Text already read from an uploaded file.
    Text(String),
    /// A URL the collaborator resolves itself (YouTube or article page).
    Url { url: String, kind: SourceKind },
}

/// Resolved study text plus the card set derived from it.
#[derive(Debug, Clone)]
pub struct ExtractionOutput {
    pub text: String,
    pub cards: Vec<FlashcardDraft>,
}

/// Trait for the model-backed generation operations the services need.
///
/// Every failure surfaces as [`AppError::GenerationFailed`]; callers decide
/// what to persist (never partial output).
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Resolve a material's source into study text and draft flashcards.
    async fn extract_flashcards(
        &self,
        request: &ExtractionRequest,
    ) -> Result<ExtractionOutput, AppError>;

    /// Produce `num_questions` quiz questions over the study text.
    async fn generate_quiz(
        &self,
        source_text: &str,
        num_questions: usize,
    ) -> Result<Vec<QuizQuestion>, AppError>;

    /// Answer a learner question grounded in the study text, given the
    /// prior conversation.
    async fn chat_reply(
        &self,
        source_text: &str,
        history: &[ChatMessage],
        message: &str,
    ) -> Result<String, AppError>;
}
