//! Flashcard endpoints: the review queue, review submission, listing, stats.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use glossa_core::models::{FlashcardResponse, ReviewOutcome, ReviewStats};
use glossa_core::srs::ReviewQuality;

use crate::auth::UserContext;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::services::CardService;

#[derive(Debug, Deserialize)]
pub struct ReviewQueueQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ListCardsQuery {
    pub material_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ReviewRequest {
    /// `"know"` advances the card, `"forgot"` resets it to stage 0.
    pub quality: ReviewQuality,
}

#[utoipa::path(
    get,
    path = "/api/v1/cards",
    tag = "cards",
    params(("material_id" = Option<Uuid>, Query, description = "Restrict to one material")),
    responses(
        (status = 200, description = "Cards for the user", body = Vec<FlashcardResponse>),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    )
)]
pub async fn list_cards(
    State(service): State<CardService>,
    ctx: UserContext,
    Query(query): Query<ListCardsQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    let cards = service.list(ctx.user_id, query.material_id).await?;
    let response: Vec<FlashcardResponse> =
        cards.into_iter().map(FlashcardResponse::from).collect();
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/api/v1/cards/review",
    tag = "cards",
    params(("limit" = Option<i64>, Query, description = "Queue size, default 20, max 100")),
    responses(
        (status = 200, description = "Cards due now, oldest due first", body = Vec<FlashcardResponse>),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    )
)]
pub async fn review_queue(
    State(service): State<CardService>,
    ctx: UserContext,
    Query(query): Query<ReviewQueueQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    let cards = service.review_queue(ctx.user_id, query.limit).await?;
    let response: Vec<FlashcardResponse> =
        cards.into_iter().map(FlashcardResponse::from).collect();
    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/api/v1/cards/{id}/review",
    tag = "cards",
    params(("id" = Uuid, Path, description = "Flashcard ID")),
    request_body = ReviewRequest,
    responses(
        (status = 200, description = "Card rescheduled", body = ReviewOutcome),
        (status = 404, description = "Flashcard not found", body = ErrorResponse),
        (status = 409, description = "Card was reviewed concurrently", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(service, request), fields(user_id = %ctx.user_id))]
pub async fn submit_review(
    State(service): State<CardService>,
    ctx: UserContext,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<ReviewRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let outcome = service
        .submit_review(ctx.user_id, id, request.quality)
        .await?;
    Ok(Json(outcome))
}

#[utoipa::path(
    get,
    path = "/api/v1/cards/stats",
    tag = "cards",
    responses(
        (status = 200, description = "Aggregate review statistics", body = ReviewStats),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    )
)]
pub async fn card_stats(
    State(service): State<CardService>,
    ctx: UserContext,
) -> Result<impl IntoResponse, HttpAppError> {
    let stats = service.stats(ctx.user_id).await?;
    Ok(Json(stats))
}
