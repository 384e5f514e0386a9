//! Route configuration and setup

use std::sync::Arc;

use anyhow::Result;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use glossa_core::Config;

use crate::auth::middleware::{auth_middleware, AuthState};
use crate::constants::API_PREFIX;
use crate::handlers;
use crate::middleware::request_id_middleware;
use crate::state::AppState;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router<()>> {
    let cors = setup_cors(config)?;
    let auth_state = Arc::new(AuthState::from_secret(config.jwt_secret()));

    let public_routes = public_routes(state.clone());
    let protected_routes = protected_routes(state.clone())
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            auth_middleware,
        ));

    let app = public_routes
        .merge(protected_routes)
        .nest(
            "/docs",
            utoipa_rapidoc::RapiDoc::new("/api/openapi.json")
                .path("/docs")
                .into(),
        )
        // The multipart handler enforces the real per-file limit itself;
        // this layer only caps what a request may buffer.
        .layer(RequestBodyLimitLayer::new(
            config.max_upload_size_bytes() + 64 * 1024,
        ))
        .layer(DefaultBodyLimit::disable())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(request_id_middleware))
        .with_state(state);

    Ok(app)
}

/// Setup CORS configuration
fn setup_cors(config: &Config) -> Result<CorsLayer> {
    let cors = if config.cors_origins().contains(&"*".to_string()) {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers(Any)
    } else {
        let origins: Result<Vec<HeaderValue>, _> =
            config.cors_origins().iter().map(|o| o.parse()).collect();
        CorsLayer::new()
            .allow_origin(origins.unwrap_or_default())
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers(Any)
    };
    Ok(cors)
}

/// Public routes (no authentication required)
fn public_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/health/live", get(handlers::health::liveness_check))
        .route("/health/ready", get(handlers::health::readiness_check))
        .with_state(state)
        .route(
            "/api/openapi.json",
            get(|| async { Json(crate::api_doc::get_openapi_spec()) }),
        )
}

/// Protected routes (require the bearer token).
fn protected_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .merge(material_routes())
        .merge(card_routes())
        .merge(quiz_routes())
        .merge(chat_routes())
        .merge(payment_routes())
        .route(
            &format!("{}/auth/me", API_PREFIX),
            get(handlers::me::me),
        )
        .with_state(state)
}

fn material_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            &format!("{}/materials", API_PREFIX),
            get(handlers::materials::list_materials),
        )
        .route(
            &format!("{}/materials/upload/youtube", API_PREFIX),
            post(handlers::materials::upload_youtube),
        )
        .route(
            &format!("{}/materials/upload/file", API_PREFIX),
            post(handlers::materials::upload_file),
        )
        .route(
            &format!("{}/materials/{{id}}", API_PREFIX),
            get(handlers::materials::get_material),
        )
        .route(
            &format!("{}/materials/{{id}}/status", API_PREFIX),
            get(handlers::materials::material_status),
        )
        .route(
            &format!("{}/materials/{{id}}/process", API_PREFIX),
            post(handlers::materials::process_material),
        )
        .route(
            &format!("{}/materials/{{id}}", API_PREFIX),
            delete(handlers::materials::delete_material),
        )
}

fn card_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            &format!("{}/cards", API_PREFIX),
            get(handlers::cards::list_cards),
        )
        .route(
            &format!("{}/cards/review", API_PREFIX),
            get(handlers::cards::review_queue),
        )
        .route(
            &format!("{}/cards/stats", API_PREFIX),
            get(handlers::cards::card_stats),
        )
        .route(
            &format!("{}/cards/{{id}}/review", API_PREFIX),
            post(handlers::cards::submit_review),
        )
}

fn quiz_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            &format!("{}/quizzes", API_PREFIX),
            post(handlers::quizzes::create_quiz),
        )
        .route(
            &format!("{}/quizzes/material/{{material_id}}", API_PREFIX),
            get(handlers::quizzes::list_quizzes_for_material),
        )
        .route(
            &format!("{}/quizzes/{{quiz_id}}", API_PREFIX),
            get(handlers::quizzes::get_quiz),
        )
        .route(
            &format!("{}/quizzes/{{quiz_id}}/submit", API_PREFIX),
            post(handlers::quizzes::submit_quiz),
        )
        .route(
            &format!("{}/quizzes/{{quiz_id}}", API_PREFIX),
            delete(handlers::quizzes::delete_quiz),
        )
}

fn chat_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            &format!("{}/chat/{{material_id}}", API_PREFIX),
            get(handlers::chat::chat_history)
                .post(handlers::chat::send_message)
                .delete(handlers::chat::clear_chat),
        )
}

fn payment_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            &format!("{}/payments/subscription", API_PREFIX),
            get(handlers::payments::get_subscription),
        )
        .route(
            &format!("{}/payments/create-checkout-session", API_PREFIX),
            post(handlers::payments::create_checkout_session),
        )
        .route(
            &format!("{}/payments/cancel", API_PREFIX),
            post(handlers::payments::cancel_subscription),
        )
        .route(
            &format!("{}/payments/reactivate", API_PREFIX),
            post(handlers::payments::reactivate_subscription),
        )
}
