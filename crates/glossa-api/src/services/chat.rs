//! Per-material tutor conversations, gated on the pro plan.
//!
//! A send is a two-write exchange: persist the user turn, ask the generator
//! for a reply with the prior history as context, persist the assistant
//! turn. If generation fails the user turn is rolled back so a retry does
//! not duplicate it.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use glossa_core::entitlements::resolve;
use glossa_core::models::{
    ChatExchangeResponse, ChatMessage, ChatRole, Material, MaterialStatus,
};
use glossa_core::{AppError, Config};
use glossa_db::stores::{ChatStore, MaterialStore, SubscriptionStore};

use glossa_ai::ContentGenerator;

#[derive(Clone)]
pub struct ChatService {
    chat: Arc<dyn ChatStore>,
    materials: Arc<dyn MaterialStore>,
    subscriptions: Arc<dyn SubscriptionStore>,
    generator: Arc<dyn ContentGenerator>,
    config: Config,
}

impl ChatService {
    pub fn new(
        chat: Arc<dyn ChatStore>,
        materials: Arc<dyn MaterialStore>,
        subscriptions: Arc<dyn SubscriptionStore>,
        generator: Arc<dyn ContentGenerator>,
        config: Config,
    ) -> Self {
        Self {
            chat,
            materials,
            subscriptions,
            generator,
            config,
        }
    }

    /// Conversation history for a material, oldest first.
    pub async fn history(
        &self,
        user_id: Uuid,
        material_id: Uuid,
    ) -> Result<Vec<ChatMessage>, AppError> {
        self.owned_material(user_id, material_id).await?;
        self.chat.list_for_material(user_id, material_id).await
    }

    /// Send one message and return the persisted exchange.
    pub async fn send(
        &self,
        user_id: Uuid,
        material_id: Uuid,
        message: &str,
    ) -> Result<ChatExchangeResponse, AppError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(AppError::InvalidInput(
                "Message must not be empty".to_string(),
            ));
        }

        self.check_chat_access(user_id).await?;

        let material = self.owned_material(user_id, material_id).await?;
        if material.status != MaterialStatus::Completed {
            return Err(AppError::InvalidTransition {
                state: material.status.to_string(),
                operation: "chat about material".to_string(),
            });
        }
        let source_text = material.extracted_text.as_deref().ok_or_else(|| {
            AppError::Internal("Completed material has no extracted text".to_string())
        })?;

        // History is captured before the new turn so the generator sees the
        // conversation as it stood when the user hit send.
        let history = self.chat.list_for_material(user_id, material_id).await?;

        let user_message = self
            .chat
            .append(user_id, material_id, ChatRole::User, message)
            .await?;

        let reply = match self
            .generator
            .chat_reply(source_text, &history, message)
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                // Roll back the user turn so the conversation has no
                // unanswered message when the client retries.
                if let Err(cleanup) = self.chat.delete_message(user_message.id).await {
                    tracing::warn!(
                        error = %cleanup,
                        message_id = %user_message.id,
                        "Failed to roll back user message after generation error"
                    );
                }
                return Err(e);
            }
        };

        let assistant_message = self
            .chat
            .append(user_id, material_id, ChatRole::Assistant, &reply)
            .await?;

        tracing::debug!(
            material_id = %material_id,
            history_len = history.len(),
            "Chat exchange completed"
        );
        Ok(ChatExchangeResponse {
            user_message: user_message.into(),
            assistant_message: assistant_message.into(),
        })
    }

    /// Delete the whole conversation for a material. Returns the number of
    /// messages removed.
    pub async fn clear(&self, user_id: Uuid, material_id: Uuid) -> Result<u64, AppError> {
        self.owned_material(user_id, material_id).await?;
        self.chat.clear_for_material(user_id, material_id).await
    }

    async fn owned_material(
        &self,
        user_id: Uuid,
        material_id: Uuid,
    ) -> Result<Material, AppError> {
        self.materials
            .get(user_id, material_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Material not found".to_string()))
    }

    async fn check_chat_access(&self, user_id: Uuid) -> Result<(), AppError> {
        let now = Utc::now();
        let trial_end = now + chrono::Duration::days(self.config.trial_days());
        let subscription = self.subscriptions.get_or_create(user_id, trial_end).await?;
        if !resolve(&subscription, now).chat_enabled {
            return Err(AppError::AccessDenied(
                "Chat tutor requires a Pro subscription".to_string(),
            ));
        }
        Ok(())
    }
}
