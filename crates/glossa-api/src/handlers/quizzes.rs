//! Quiz endpoints: generation, retrieval, submission, deletion.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use glossa_core::models::{QuizResponse, QuizSubmissionResult};

use crate::auth::UserContext;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::services::QuizService;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateQuizRequest {
    pub material_id: Uuid,
    /// Defaults to 5; values outside 1-20 are clamped.
    pub num_questions: Option<usize>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SubmitQuizRequest {
    /// One answer per question, in question order.
    pub answers: Vec<String>,
}

#[utoipa::path(
    post,
    path = "/api/v1/quizzes",
    tag = "quizzes",
    request_body = CreateQuizRequest,
    responses(
        (status = 201, description = "Quiz generated", body = QuizResponse),
        (status = 402, description = "Quiz limit reached for this material", body = ErrorResponse),
        (status = 404, description = "Material not found", body = ErrorResponse),
        (status = 409, description = "Material is not processed yet", body = ErrorResponse),
        (status = 502, description = "Question generation failed", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(service, request), fields(user_id = %ctx.user_id))]
pub async fn create_quiz(
    State(service): State<QuizService>,
    ctx: UserContext,
    ValidatedJson(request): ValidatedJson<CreateQuizRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let quiz = service
        .generate(ctx.user_id, request.material_id, request.num_questions)
        .await?;
    Ok((StatusCode::CREATED, Json(QuizResponse::from(quiz))))
}

#[utoipa::path(
    get,
    path = "/api/v1/quizzes/material/{material_id}",
    tag = "quizzes",
    params(("material_id" = Uuid, Path, description = "Material ID")),
    responses(
        (status = 200, description = "Quizzes for the material", body = Vec<QuizResponse>),
        (status = 404, description = "Material not found", body = ErrorResponse)
    )
)]
pub async fn list_quizzes_for_material(
    State(service): State<QuizService>,
    ctx: UserContext,
    Path(material_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let quizzes = service.list_for_material(ctx.user_id, material_id).await?;
    let response: Vec<QuizResponse> = quizzes.into_iter().map(QuizResponse::from).collect();
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/api/v1/quizzes/{quiz_id}",
    tag = "quizzes",
    params(("quiz_id" = Uuid, Path, description = "Quiz ID")),
    responses(
        (status = 200, description = "Quiz found", body = QuizResponse),
        (status = 404, description = "Quiz not found", body = ErrorResponse)
    )
)]
pub async fn get_quiz(
    State(service): State<QuizService>,
    ctx: UserContext,
    Path(quiz_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let quiz = service.get(ctx.user_id, quiz_id).await?;
    Ok(Json(QuizResponse::from(quiz)))
}

#[utoipa::path(
    post,
    path = "/api/v1/quizzes/{quiz_id}/submit",
    tag = "quizzes",
    params(("quiz_id" = Uuid, Path, description = "Quiz ID")),
    request_body = SubmitQuizRequest,
    responses(
        (status = 200, description = "Submission graded", body = QuizSubmissionResult),
        (status = 400, description = "Answer count does not match", body = ErrorResponse),
        (status = 404, description = "Quiz not found", body = ErrorResponse),
        (status = 409, description = "Quiz was already submitted", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(service, request), fields(user_id = %ctx.user_id))]
pub async fn submit_quiz(
    State(service): State<QuizService>,
    ctx: UserContext,
    Path(quiz_id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<SubmitQuizRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let result = service
        .submit(ctx.user_id, quiz_id, &request.answers)
        .await?;
    Ok(Json(result))
}

#[utoipa::path(
    delete,
    path = "/api/v1/quizzes/{quiz_id}",
    tag = "quizzes",
    params(("quiz_id" = Uuid, Path, description = "Quiz ID")),
    responses(
        (status = 204, description = "Quiz deleted"),
        (status = 404, description = "Quiz not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(service), fields(user_id = %ctx.user_id))]
pub async fn delete_quiz(
    State(service): State<QuizService>,
    ctx: UserContext,
    Path(quiz_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    service.delete(ctx.user_id, quiz_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
