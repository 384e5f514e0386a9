//! Material endpoints: registration, listing, ingestion kickoff, deletion.
//!
//! Registration never starts ingestion; the client polls nothing until it
//! explicitly POSTs to `/process`. That keeps uploads cheap and lets the
//! client batch-register before burning generation credits.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use glossa_core::models::{
    FlashcardResponse, IngestionAccepted, MaterialResponse, MaterialStatusResponse,
};

use crate::auth::UserContext;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::services::{CardService, MaterialService};
use crate::services::materials::classify_source_url;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct YoutubeUploadRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,
    #[validate(url(message = "Must be a valid URL"))]
    pub url: String,
}

/// Material plus its flashcards, for the detail view.
#[derive(Debug, serde::Serialize, ToSchema)]
pub struct MaterialDetailResponse {
    #[serde(flatten)]
    pub material: MaterialResponse,
    pub flashcards: Vec<FlashcardResponse>,
}

#[utoipa::path(
    get,
    path = "/api/v1/materials",
    tag = "materials",
    responses(
        (status = 200, description = "All materials for the user", body = Vec<MaterialResponse>),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    )
)]
pub async fn list_materials(
    State(service): State<MaterialService>,
    ctx: UserContext,
) -> Result<impl IntoResponse, HttpAppError> {
    let materials = service.list(ctx.user_id).await?;
    let response: Vec<MaterialResponse> =
        materials.into_iter().map(MaterialResponse::from).collect();
    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/api/v1/materials/upload/youtube",
    tag = "materials",
    request_body = YoutubeUploadRequest,
    responses(
        (status = 201, description = "Material registered", body = MaterialResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 402, description = "Weekly upload limit reached", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(service, request), fields(user_id = %ctx.user_id))]
pub async fn upload_youtube(
    State(service): State<MaterialService>,
    ctx: UserContext,
    ValidatedJson(request): ValidatedJson<YoutubeUploadRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let kind = classify_source_url(&request.url);
    let material = service
        .create_from_url(ctx.user_id, &request.title, kind, &request.url)
        .await?;
    Ok((StatusCode::CREATED, Json(MaterialResponse::from(material))))
}

#[utoipa::path(
    post,
    path = "/api/v1/materials/upload/file",
    tag = "materials",
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Material registered", body = MaterialResponse),
        (status = 400, description = "Invalid file", body = ErrorResponse),
        (status = 402, description = "Weekly upload limit reached", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(service, multipart), fields(user_id = %ctx.user_id))]
pub async fn upload_file(
    State(service): State<MaterialService>,
    ctx: UserContext,
    multipart: Multipart,
) -> Result<impl IntoResponse, HttpAppError> {
    let material = service.create_from_upload(ctx.user_id, multipart).await?;
    Ok((StatusCode::CREATED, Json(MaterialResponse::from(material))))
}

#[utoipa::path(
    get,
    path = "/api/v1/materials/{id}",
    tag = "materials",
    params(("id" = Uuid, Path, description = "Material ID")),
    responses(
        (status = 200, description = "Material with its flashcards", body = MaterialDetailResponse),
        (status = 404, description = "Material not found", body = ErrorResponse)
    )
)]
pub async fn get_material(
    State(materials): State<MaterialService>,
    State(cards): State<CardService>,
    ctx: UserContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let material = materials.get(ctx.user_id, id).await?;
    let flashcards = cards.list(ctx.user_id, Some(id)).await?;
    Ok(Json(MaterialDetailResponse {
        material: MaterialResponse::from(material),
        flashcards: flashcards.into_iter().map(FlashcardResponse::from).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/materials/{id}/status",
    tag = "materials",
    params(("id" = Uuid, Path, description = "Material ID")),
    responses(
        (status = 200, description = "Current processing status", body = MaterialStatusResponse),
        (status = 404, description = "Material not found", body = ErrorResponse)
    )
)]
pub async fn material_status(
    State(service): State<MaterialService>,
    ctx: UserContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let material = service.get(ctx.user_id, id).await?;
    Ok(Json(MaterialStatusResponse::from(&material)))
}

#[utoipa::path(
    post,
    path = "/api/v1/materials/{id}/process",
    tag = "materials",
    params(("id" = Uuid, Path, description = "Material ID")),
    responses(
        (status = 202, description = "Ingestion started", body = IngestionAccepted),
        (status = 404, description = "Material not found", body = ErrorResponse),
        (status = 409, description = "Material is not in a startable state", body = ErrorResponse),
        (status = 503, description = "Ingestion queue is full", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(service), fields(user_id = %ctx.user_id))]
pub async fn process_material(
    State(service): State<MaterialService>,
    ctx: UserContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let material = service.start_ingestion(ctx.user_id, id).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(IngestionAccepted {
            message: "Processing started".to_string(),
            material_id: material.id,
        }),
    ))
}

#[utoipa::path(
    delete,
    path = "/api/v1/materials/{id}",
    tag = "materials",
    params(("id" = Uuid, Path, description = "Material ID")),
    responses(
        (status = 204, description = "Material and derived content deleted"),
        (status = 404, description = "Material not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(service), fields(user_id = %ctx.user_id))]
pub async fn delete_material(
    State(service): State<MaterialService>,
    ctx: UserContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    service.delete(ctx.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
