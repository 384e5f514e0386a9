//! OpenAPI documentation.
//! All endpoints live under the fixed `/api/v1` prefix from
//! `crate::constants`, so handler annotations spell the real paths.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use glossa_core::models;

pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Glossa API",
        version = "0.1.0",
        description = "Language-learning backend: import study materials, extract vocabulary flashcards, schedule spaced-repetition reviews, generate quizzes, and chat with a tutor grounded in the material. All endpoints are versioned under /api/v1/."
    ),
    paths(
        // Materials
        handlers::materials::list_materials,
        handlers::materials::upload_youtube,
        handlers::materials::upload_file,
        handlers::materials::get_material,
        handlers::materials::material_status,
        handlers::materials::process_material,
        handlers::materials::delete_material,
        // Cards
        handlers::cards::list_cards,
        handlers::cards::review_queue,
        handlers::cards::submit_review,
        handlers::cards::card_stats,
        // Quizzes
        handlers::quizzes::create_quiz,
        handlers::quizzes::list_quizzes_for_material,
        handlers::quizzes::get_quiz,
        handlers::quizzes::submit_quiz,
        handlers::quizzes::delete_quiz,
        // Chat
        handlers::chat::chat_history,
        handlers::chat::send_message,
        handlers::chat::clear_chat,
        // Payments
        handlers::payments::get_subscription,
        handlers::payments::create_checkout_session,
        handlers::payments::cancel_subscription,
        handlers::payments::reactivate_subscription,
        // Auth
        handlers::me::me,
        // Health
        handlers::health::health_check,
    ),
    components(
        schemas(
            // Material models
            models::MaterialResponse,
            models::MaterialStatusResponse,
            models::MaterialStatus,
            models::SourceKind,
            models::IngestionAccepted,
            handlers::materials::YoutubeUploadRequest,
            handlers::materials::MaterialDetailResponse,
            // Flashcard models
            models::FlashcardResponse,
            models::LearningStage,
            models::ReviewOutcome,
            models::ReviewStats,
            glossa_core::srs::ReviewQuality,
            handlers::cards::ReviewRequest,
            // Quiz models
            models::QuizResponse,
            models::QuizQuestion,
            models::QuizOption,
            models::QuestionKind,
            models::AnswerResult,
            models::QuizSubmissionResult,
            handlers::quizzes::CreateQuizRequest,
            handlers::quizzes::SubmitQuizRequest,
            // Chat models
            models::ChatMessageResponse,
            models::ChatExchangeResponse,
            models::ChatRole,
            handlers::chat::SendMessageRequest,
            // Subscription models
            models::SubscriptionResponse,
            models::SubscriptionStatus,
            models::PlanTier,
            models::CheckoutSessionResponse,
            // Auth
            handlers::me::UserResponse,
            // Error
            error::ErrorResponse,
        )
    ),
    tags(
        (name = "materials", description = "Import and manage study materials; start ingestion"),
        (name = "cards", description = "Flashcard review queue and spaced-repetition scheduling"),
        (name = "quizzes", description = "Quiz generation and grading"),
        (name = "chat", description = "Material-grounded tutor conversations"),
        (name = "payments", description = "Subscription, plan limits, and checkout"),
        (name = "auth", description = "Authenticated identity"),
        (name = "health", description = "Service health probes")
    )
)]
pub struct ApiDoc;
