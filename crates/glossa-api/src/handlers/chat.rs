//! Chat tutor endpoints, keyed by material.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use glossa_core::models::{ChatExchangeResponse, ChatMessageResponse};

use crate::auth::UserContext;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::services::ChatService;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SendMessageRequest {
    #[validate(length(min = 1, max = 4000, message = "Message must be 1-4000 characters"))]
    pub message: String,
}

#[utoipa::path(
    get,
    path = "/api/v1/chat/{material_id}",
    tag = "chat",
    params(("material_id" = Uuid, Path, description = "Material ID")),
    responses(
        (status = 200, description = "Conversation history, oldest first", body = Vec<ChatMessageResponse>),
        (status = 404, description = "Material not found", body = ErrorResponse)
    )
)]
pub async fn chat_history(
    State(service): State<ChatService>,
    ctx: UserContext,
    Path(material_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let messages = service.history(ctx.user_id, material_id).await?;
    let response: Vec<ChatMessageResponse> = messages
        .into_iter()
        .map(ChatMessageResponse::from)
        .collect();
    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/api/v1/chat/{material_id}",
    tag = "chat",
    params(("material_id" = Uuid, Path, description = "Material ID")),
    request_body = SendMessageRequest,
    responses(
        (status = 200, description = "Exchange persisted", body = ChatExchangeResponse),
        (status = 403, description = "Chat requires a Pro subscription", body = ErrorResponse),
        (status = 404, description = "Material not found", body = ErrorResponse),
        (status = 409, description = "Material is not processed yet", body = ErrorResponse),
        (status = 502, description = "Reply generation failed", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(service, request), fields(user_id = %ctx.user_id))]
pub async fn send_message(
    State(service): State<ChatService>,
    ctx: UserContext,
    Path(material_id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<SendMessageRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let exchange = service
        .send(ctx.user_id, material_id, &request.message)
        .await?;
    Ok(Json(exchange))
}

#[utoipa::path(
    delete,
    path = "/api/v1/chat/{material_id}",
    tag = "chat",
    params(("material_id" = Uuid, Path, description = "Material ID")),
    responses(
        (status = 204, description = "Conversation cleared"),
        (status = 404, description = "Material not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(service), fields(user_id = %ctx.user_id))]
pub async fn clear_chat(
    State(service): State<ChatService>,
    ctx: UserContext,
    Path(material_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    service.clear(ctx.user_id, material_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
