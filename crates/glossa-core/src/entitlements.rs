//! Entitlement resolution and the weekly quota window.
//!
//! `resolve` maps a subscription row plus the current time onto the
//! capability set the other components consult. Pure functions only; the
//! quota ledger applies `roll_week` inside its conditional update.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::models::{PlanTier, Subscription, SubscriptionStatus};

/// Capability set derived from a subscription tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct Entitlements {
    pub upload_limit: i32,
    pub quiz_limit_per_material: i32,
    pub chat_enabled: bool,
}

impl Entitlements {
    pub const FREE: Entitlements = Entitlements {
        upload_limit: 1,
        quiz_limit_per_material: 3,
        chat_enabled: false,
    };

    pub const PRO: Entitlements = Entitlements {
        upload_limit: 10,
        quiz_limit_per_material: 10,
        chat_enabled: true,
    };

    pub fn for_tier(tier: PlanTier) -> Self {
        match tier {
            PlanTier::Free => Self::FREE,
            PlanTier::Pro => Self::PRO,
        }
    }
}

/// Tier a subscription actually grants at `now`, regardless of what the
/// billing provider last wrote. `past_due` and `canceled` keep pro until the
/// paid period lapses; an elapsed trial falls back to free.
pub fn effective_tier(subscription: &Subscription, now: DateTime<Utc>) -> PlanTier {
    match subscription.status {
        SubscriptionStatus::Active => PlanTier::Pro,
        SubscriptionStatus::Trialing => match subscription.trial_end {
            Some(trial_end) if now >= trial_end => PlanTier::Free,
            _ => PlanTier::Pro,
        },
        SubscriptionStatus::PastDue | SubscriptionStatus::Canceled => {
            match subscription.current_period_end {
                Some(period_end) if now < period_end => PlanTier::Pro,
                _ => PlanTier::Free,
            }
        }
        SubscriptionStatus::Free => PlanTier::Free,
    }
}

/// Resolve the capability set for a subscription at `now`.
pub fn resolve(subscription: &Subscription, now: DateTime<Utc>) -> Entitlements {
    Entitlements::for_tier(effective_tier(subscription, now))
}

/// Roll the weekly quota window forward until `now` falls inside it.
/// Each whole week that elapsed zeroes the counter; the loop catches up
/// after arbitrarily long inactivity.
pub fn roll_week(
    uploads_this_week: i32,
    week_reset_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> (i32, DateTime<Utc>) {
    let mut counter = uploads_this_week;
    let mut reset_at = week_reset_at;
    while now >= reset_at {
        counter = 0;
        reset_at += Duration::days(7);
    }
    (counter, reset_at)
}
