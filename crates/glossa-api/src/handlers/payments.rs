//! Billing endpoints: subscription state, checkout hand-off, cancellation.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use glossa_core::models::{CheckoutSessionResponse, SubscriptionResponse};

use crate::auth::UserContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::services::PaymentService;

#[utoipa::path(
    get,
    path = "/api/v1/payments/subscription",
    tag = "payments",
    responses(
        (status = 200, description = "Subscription with resolved plan limits", body = SubscriptionResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    )
)]
pub async fn get_subscription(
    State(service): State<PaymentService>,
    ctx: UserContext,
) -> Result<impl IntoResponse, HttpAppError> {
    let subscription = service.get_subscription(ctx.user_id).await?;
    Ok(Json(subscription))
}

#[utoipa::path(
    post,
    path = "/api/v1/payments/create-checkout-session",
    tag = "payments",
    responses(
        (status = 200, description = "Checkout session created", body = CheckoutSessionResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(service), fields(user_id = %ctx.user_id))]
pub async fn create_checkout_session(
    State(service): State<PaymentService>,
    ctx: UserContext,
) -> Result<impl IntoResponse, HttpAppError> {
    let session = service.create_checkout_session(ctx.user_id).await?;
    Ok(Json(session))
}

#[utoipa::path(
    post,
    path = "/api/v1/payments/cancel",
    tag = "payments",
    responses(
        (status = 200, description = "Subscription flagged to lapse at period end", body = SubscriptionResponse),
        (status = 409, description = "No paid subscription to cancel", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(service), fields(user_id = %ctx.user_id))]
pub async fn cancel_subscription(
    State(service): State<PaymentService>,
    ctx: UserContext,
) -> Result<impl IntoResponse, HttpAppError> {
    let subscription = service.cancel(ctx.user_id).await?;
    Ok(Json(subscription))
}

#[utoipa::path(
    post,
    path = "/api/v1/payments/reactivate",
    tag = "payments",
    responses(
        (status = 200, description = "Pending cancellation cleared", body = SubscriptionResponse),
        (status = 409, description = "No paid subscription to reactivate", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(service), fields(user_id = %ctx.user_id))]
pub async fn reactivate_subscription(
    State(service): State<PaymentService>,
    ctx: UserContext,
) -> Result<impl IntoResponse, HttpAppError> {
    let subscription = service.reactivate(ctx.user_id).await?;
    Ok(Json(subscription))
}
