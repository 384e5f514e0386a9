//! Repository for subscriptions and the weekly upload quota
//!
//! Upload reservation is optimistic: read the row, roll the quota window
//! in process, then write back conditional on the values that were read.
//! Two racing reservations cannot both land; the loser re-reads and either
//! retries or is denied at the limit.

use chrono::{DateTime, Duration, Utc};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use glossa_core::entitlements::roll_week;
use glossa_core::error::AppError;
use glossa_core::models::{PlanTier, Subscription, SubscriptionStatus};

use crate::stores::UploadReservation;

/// Bound on optimistic retries before giving up with a conflict.
const MAX_RESERVE_ATTEMPTS: usize = 4;

#[derive(Clone)]
pub struct SubscriptionRepository {
    pool: PgPool,
}

impl SubscriptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self), fields(db.table = "subscriptions"))]
    pub async fn get(&self, user_id: Uuid) -> Result<Option<Subscription>, AppError> {
        let subscription = sqlx::query_as::<Postgres, Subscription>(
            "SELECT * FROM subscriptions WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(subscription)
    }

    /// Fetch the user's subscription, creating a trialing one on first
    /// touch. The insert is `ON CONFLICT DO NOTHING`, so two concurrent
    /// first touches converge on a single row.
    #[tracing::instrument(skip(self), fields(db.table = "subscriptions", db.operation = "insert"))]
    pub async fn get_or_create(
        &self,
        user_id: Uuid,
        trial_end: DateTime<Utc>,
    ) -> Result<Subscription, AppError> {
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO subscriptions
                (user_id, status, tier, trial_end, cancel_at_period_end, uploads_this_week, week_reset_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, FALSE, 0, $5, $6, $6)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(SubscriptionStatus::Trialing)
        .bind(PlanTier::Pro)
        .bind(trial_end)
        .bind(now + Duration::days(7))
        .bind(now)
        .execute(&self.pool)
        .await?;

        let subscription = sqlx::query_as::<Postgres, Subscription>(
            "SELECT * FROM subscriptions WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(subscription)
    }

    /// Reserve one upload slot in the rolling weekly window.
    ///
    /// The window roll and the increment are written together, conditional
    /// on the counter and reset time the decision was based on. A lost race
    /// re-reads and retries; at the limit the reservation is denied without
    /// writing.
    #[tracing::instrument(skip(self), fields(db.table = "subscriptions", db.operation = "update", limit = limit))]
    pub async fn reserve_upload(
        &self,
        user_id: Uuid,
        limit: i32,
    ) -> Result<UploadReservation, AppError> {
        for _ in 0..MAX_RESERVE_ATTEMPTS {
            let subscription = self
                .get(user_id)
                .await?
                .ok_or_else(|| AppError::NotFound("Subscription not found".to_string()))?;

            let now = Utc::now();
            let (used, reset_at) =
                roll_week(subscription.uploads_this_week, subscription.week_reset_at, now);

            if used >= limit {
                return Ok(UploadReservation::Denied { used });
            }

            let updated = sqlx::query_as::<Postgres, Subscription>(
                r#"
                UPDATE subscriptions
                SET uploads_this_week = $2, week_reset_at = $3, updated_at = NOW()
                WHERE user_id = $1 AND uploads_this_week = $4 AND week_reset_at = $5
                RETURNING *
                "#,
            )
            .bind(user_id)
            .bind(used + 1)
            .bind(reset_at)
            .bind(subscription.uploads_this_week)
            .bind(subscription.week_reset_at)
            .fetch_optional(&self.pool)
            .await?;

            if let Some(subscription) = updated {
                return Ok(UploadReservation::Granted(subscription));
            }

            tracing::debug!(%user_id, "Upload reservation lost a write race, retrying");
        }

        Err(AppError::Conflict(
            "Upload quota is under heavy contention, please retry".to_string(),
        ))
    }

    /// Persist a rolled quota window without reserving a slot. Keeps the
    /// subscription view consistent when it is read long after the last
    /// upload. Best effort: a lost race means someone else already rolled.
    #[tracing::instrument(skip(self), fields(db.table = "subscriptions", db.operation = "update"))]
    pub async fn persist_window_roll(
        &self,
        subscription: &Subscription,
        used: i32,
        reset_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE subscriptions
            SET uploads_this_week = $2, week_reset_at = $3, updated_at = NOW()
            WHERE user_id = $1 AND uploads_this_week = $4 AND week_reset_at = $5
            "#,
        )
        .bind(subscription.user_id)
        .bind(used)
        .bind(reset_at)
        .bind(subscription.uploads_this_week)
        .bind(subscription.week_reset_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Flag or unflag cancellation at the end of the current period.
    #[tracing::instrument(skip(self), fields(db.table = "subscriptions", db.operation = "update", cancel = cancel))]
    pub async fn set_cancel_at_period_end(
        &self,
        user_id: Uuid,
        cancel: bool,
    ) -> Result<Option<Subscription>, AppError> {
        let subscription = sqlx::query_as::<Postgres, Subscription>(
            r#"
            UPDATE subscriptions
            SET cancel_at_period_end = $2, updated_at = NOW()
            WHERE user_id = $1
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(cancel)
        .fetch_optional(&self.pool)
        .await?;

        Ok(subscription)
    }

    /// Attach a billing-provider customer id on first checkout; later
    /// checkouts keep the existing id.
    #[tracing::instrument(skip(self), fields(db.table = "subscriptions", db.operation = "update"))]
    pub async fn ensure_billing_customer(
        &self,
        user_id: Uuid,
        customer_id: &str,
    ) -> Result<Option<Subscription>, AppError> {
        let subscription = sqlx::query_as::<Postgres, Subscription>(
            r#"
            UPDATE subscriptions
            SET billing_customer_id = COALESCE(billing_customer_id, $2), updated_at = NOW()
            WHERE user_id = $1
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(subscription)
    }
}
