//! Application state and service extractors.
//!
//! AppState aggregates the domain services so handlers can extract only what
//! they need via Axum's `FromRef`, instead of threading a god object through
//! every signature.

use glossa_core::Config;
use sqlx::PgPool;
use std::sync::Arc;

use crate::services::{CardService, ChatService, MaterialService, PaymentService, QuizService};

/// Main application state: aggregates the domain services for dependency injection.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub materials: MaterialService,
    pub cards: CardService,
    pub quizzes: QuizService,
    pub chat: ChatService,
    pub payments: PaymentService,
    pub config: Config,
    pub is_production: bool,
}

// ----- FromRef for service extraction -----

impl axum::extract::FromRef<Arc<AppState>> for MaterialService {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.materials.clone()
    }
}

impl axum::extract::FromRef<Arc<AppState>> for CardService {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.cards.clone()
    }
}

impl axum::extract::FromRef<Arc<AppState>> for QuizService {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.quizzes.clone()
    }
}

impl axum::extract::FromRef<Arc<AppState>> for ChatService {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.chat.clone()
    }
}

impl axum::extract::FromRef<Arc<AppState>> for PaymentService {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.payments.clone()
    }
}

fn _assert_app_state_send_sync() {
    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}
    assert_send::<AppState>();
    assert_sync::<AppState>();
}
