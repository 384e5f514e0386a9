//! Application setup and initialization
//!
//! All initialization logic lives here instead of main.rs so the pieces can
//! be assembled differently in tests.

pub mod database;
pub mod routes;
pub mod server;

use std::sync::Arc;

use anyhow::{Context, Result};

use glossa_ai::AnthropicGenerator;
use glossa_core::Config;
use glossa_db::{
    ChatRepository, FlashcardRepository, MaterialRepository, QuizRepository,
    SubscriptionRepository,
};

use crate::ingestion::IngestionQueue;
use crate::services::{CardService, ChatService, MaterialService, PaymentService, QuizService};
use crate::state::AppState;

/// Initialize the entire application: config validation, telemetry, database,
/// the ingestion worker pool, services, and the router.
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    // Fail fast on misconfiguration
    config.validate().context("Configuration validation failed")?;

    crate::telemetry::init_telemetry(config.log_json());
    tracing::info!(
        environment = %config.environment(),
        "Configuration loaded and validated"
    );

    let pool = database::setup_database(&config).await?;

    let state = initialize_services(&config, pool)?;

    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}

/// Wire repositories, the generator, the ingestion queue, and the domain
/// services into an `AppState`.
pub fn initialize_services(config: &Config, pool: sqlx::PgPool) -> Result<Arc<AppState>> {
    let materials_repo = Arc::new(MaterialRepository::new(pool.clone()));
    let cards_repo = Arc::new(FlashcardRepository::new(pool.clone()));
    let quizzes_repo = Arc::new(QuizRepository::new(pool.clone()));
    let chat_repo = Arc::new(ChatRepository::new(pool.clone()));
    let subscriptions_repo = Arc::new(SubscriptionRepository::new(pool.clone()));

    let generator = Arc::new(
        AnthropicGenerator::new(config).context("Failed to build the content generator")?,
    );

    let queue = IngestionQueue::new(
        materials_repo.clone(),
        generator.clone(),
        config.ingestion_queue_size(),
        config.ingestion_max_concurrent(),
    );

    let state = AppState {
        pool,
        materials: MaterialService::new(
            materials_repo.clone(),
            subscriptions_repo.clone(),
            queue,
            config.clone(),
        ),
        cards: CardService::new(cards_repo),
        quizzes: QuizService::new(
            quizzes_repo,
            materials_repo.clone(),
            subscriptions_repo.clone(),
            generator.clone(),
            config.clone(),
        ),
        chat: ChatService::new(
            chat_repo,
            materials_repo,
            subscriptions_repo.clone(),
            generator,
            config.clone(),
        ),
        payments: PaymentService::new(subscriptions_repo, config.clone()),
        config: config.clone(),
        is_production: config.is_production(),
    };

    Ok(Arc::new(state))
}
