//! Subscription state, checkout hand-off, and cancellation.
//!
//! The subscription row is provisioned lazily with a trial on first read.
//! Reads also roll the weekly quota window forward when it has lapsed, so
//! the ledger stays honest without a scheduled job.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use glossa_core::entitlements::{effective_tier, resolve, roll_week};
use glossa_core::models::{
    CheckoutSessionResponse, Subscription, SubscriptionResponse, SubscriptionStatus,
};
use glossa_core::{AppError, Config};
use glossa_db::stores::SubscriptionStore;

#[derive(Clone)]
pub struct PaymentService {
    subscriptions: Arc<dyn SubscriptionStore>,
    config: Config,
}

impl PaymentService {
    pub fn new(subscriptions: Arc<dyn SubscriptionStore>, config: Config) -> Self {
        Self {
            subscriptions,
            config,
        }
    }

    /// Current subscription with resolved plan limits. Creates the row (with
    /// a trial) on first call.
    pub async fn get_subscription(&self, user_id: Uuid) -> Result<SubscriptionResponse, AppError> {
        let now = Utc::now();
        let subscription = self.get_or_create(user_id, now).await?;

        let (used, reset_at) = roll_week(
            subscription.uploads_this_week,
            subscription.week_reset_at,
            now,
        );
        if reset_at != subscription.week_reset_at {
            self.subscriptions
                .persist_window_roll(&subscription, used, reset_at)
                .await?;
        }

        Ok(subscription_response(&subscription, now))
    }

    /// Hand the client off to checkout. The billing customer id is minted
    /// once and reused on later sessions.
    pub async fn create_checkout_session(
        &self,
        user_id: Uuid,
    ) -> Result<CheckoutSessionResponse, AppError> {
        let now = Utc::now();
        let subscription = self.get_or_create(user_id, now).await?;

        let customer_id = match subscription.billing_customer_id {
            Some(existing) => existing,
            None => {
                let minted = format!("cus_{}", Uuid::new_v4().simple());
                let updated = self
                    .subscriptions
                    .ensure_billing_customer(user_id, &minted)
                    .await?
                    .ok_or_else(|| {
                        AppError::Internal("Subscription disappeared during checkout".to_string())
                    })?;
                // The conditional write keeps a concurrently minted id
                updated.billing_customer_id.unwrap_or(minted)
            }
        };

        let session_id = format!("cs_{}", Uuid::new_v4().simple());
        let checkout_url = format!(
            "{}/{}?customer={}",
            self.config.checkout_base_url().trim_end_matches('/'),
            session_id,
            customer_id
        );

        tracing::info!(session_id = %session_id, "Checkout session created");
        Ok(CheckoutSessionResponse {
            checkout_url,
            session_id,
        })
    }

    /// Flag the subscription to lapse at the end of the paid period.
    pub async fn cancel(&self, user_id: Uuid) -> Result<SubscriptionResponse, AppError> {
        self.set_period_end_flag(user_id, true, "cancel subscription")
            .await
    }

    /// Clear a pending cancellation while the paid period is still running.
    pub async fn reactivate(&self, user_id: Uuid) -> Result<SubscriptionResponse, AppError> {
        self.set_period_end_flag(user_id, false, "reactivate subscription")
            .await
    }

    async fn set_period_end_flag(
        &self,
        user_id: Uuid,
        cancel: bool,
        operation: &str,
    ) -> Result<SubscriptionResponse, AppError> {
        let now = Utc::now();
        let subscription = self.subscriptions.get(user_id).await?;

        let state = subscription
            .as_ref()
            .map(|s| s.status)
            .unwrap_or(SubscriptionStatus::Free);
        let cancellable = matches!(
            state,
            SubscriptionStatus::Trialing | SubscriptionStatus::Active | SubscriptionStatus::PastDue
        );
        if !cancellable {
            return Err(AppError::InvalidTransition {
                state: state.to_string(),
                operation: operation.to_string(),
            });
        }

        let updated = self
            .subscriptions
            .set_cancel_at_period_end(user_id, cancel)
            .await?
            .ok_or_else(|| AppError::NotFound("Subscription not found".to_string()))?;

        tracing::info!(cancel_at_period_end = cancel, "Subscription updated");
        Ok(subscription_response(&updated, now))
    }

    async fn get_or_create(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Subscription, AppError> {
        let trial_end = now + Duration::days(self.config.trial_days());
        self.subscriptions.get_or_create(user_id, trial_end).await
    }
}

/// Project a subscription row onto the wire shape, resolving plan limits
/// and the quota window at `now`.
fn subscription_response(subscription: &Subscription, now: DateTime<Utc>) -> SubscriptionResponse {
    let entitlements = resolve(subscription, now);
    let (used, reset_at) = roll_week(
        subscription.uploads_this_week,
        subscription.week_reset_at,
        now,
    );
    SubscriptionResponse {
        status: subscription.status,
        tier: effective_tier(subscription, now),
        trial_end: subscription.trial_end,
        current_period_end: subscription.current_period_end,
        cancel_at_period_end: subscription.cancel_at_period_end,
        uploads_this_week: used,
        upload_limit: entitlements.upload_limit,
        quizzes_per_material_limit: entitlements.quiz_limit_per_material,
        week_reset_at: reset_at,
    }
}
