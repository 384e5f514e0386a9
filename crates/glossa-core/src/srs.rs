//! Spaced-repetition scheduling.
//!
//! Owns the interval table and the single transition function that maps a
//! review outcome onto a flashcard's stage and next-review timestamp. No
//! other component may derive these values.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use utoipa::ToSchema;

use crate::models::LearningStage;

/// Review interval in days per stage. Strictly increasing; index = stage.
pub const REVIEW_INTERVAL_DAYS: [i64; 6] = [1, 3, 7, 14, 30, 90];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReviewQuality {
    Forgot,
    Know,
}

impl Display for ReviewQuality {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ReviewQuality::Forgot => write!(f, "forgot"),
            ReviewQuality::Know => write!(f, "know"),
        }
    }
}

impl FromStr for ReviewQuality {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "forgot" => Ok(ReviewQuality::Forgot),
            "know" => Ok(ReviewQuality::Know),
            _ => Err(anyhow::anyhow!("Invalid review quality: {}", s)),
        }
    }
}

/// Interval until the next review for a card that just entered `stage`.
pub fn interval_for(stage: LearningStage) -> Duration {
    Duration::days(REVIEW_INTERVAL_DAYS[stage.as_i32() as usize])
}

/// Apply a review outcome: `know` advances the stage (capped at mastered),
/// `forgot` resets to stage 0. Returns the new stage and next-review time.
pub fn apply_review(
    stage: LearningStage,
    quality: ReviewQuality,
    now: DateTime<Utc>,
) -> (LearningStage, DateTime<Utc>) {
    let new_stage = match quality {
        ReviewQuality::Know => stage.advance(),
        ReviewQuality::Forgot => stage.reset(),
    };
    (new_stage, now + interval_for(new_stage))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intervals_strictly_increasing() {
        for pair in REVIEW_INTERVAL_DAYS.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn test_interval_for_each_stage() {
        assert_eq!(interval_for(LearningStage::New), Duration::days(1));
        assert_eq!(interval_for(LearningStage::Learning1), Duration::days(3));
        assert_eq!(interval_for(LearningStage::Learning2), Duration::days(7));
        assert_eq!(interval_for(LearningStage::Review1), Duration::days(14));
        assert_eq!(interval_for(LearningStage::Review2), Duration::days(30));
        assert_eq!(interval_for(LearningStage::Mastered), Duration::days(90));
    }

    #[test]
    fn test_know_advances_stage_and_schedules_new_interval() {
        let now = Utc::now();
        let (stage, next) = apply_review(LearningStage::Learning2, ReviewQuality::Know, now);
        assert_eq!(stage, LearningStage::Review1);
        assert_eq!(next, now + Duration::days(14));
    }

    #[test]
    fn test_forgot_resets_to_stage_zero_from_any_stage() {
        let now = Utc::now();
        for raw in 0..=5 {
            let (stage, next) =
                apply_review(LearningStage::from_i32(raw), ReviewQuality::Forgot, now);
            assert_eq!(stage, LearningStage::New);
            assert_eq!(next, now + Duration::days(1));
        }
    }

    #[test]
    fn test_know_is_non_decreasing_and_caps_at_mastered() {
        let now = Utc::now();
        let mut stage = LearningStage::New;
        for _ in 0..10 {
            let (next_stage, _) = apply_review(stage, ReviewQuality::Know, now);
            assert!(next_stage >= stage);
            stage = next_stage;
        }
        assert_eq!(stage, LearningStage::Mastered);

        let (still_mastered, next) = apply_review(stage, ReviewQuality::Know, now);
        assert_eq!(still_mastered, LearningStage::Mastered);
        assert_eq!(next, now + Duration::days(90));
    }

    #[test]
    fn test_know_then_forgot_sequence() {
        let now = Utc::now();
        let (stage, next) = apply_review(LearningStage::Learning2, ReviewQuality::Know, now);
        assert_eq!(stage, LearningStage::Review1);
        assert_eq!(next, now + Duration::days(14));

        let (stage, next) = apply_review(stage, ReviewQuality::Forgot, now);
        assert_eq!(stage, LearningStage::New);
        assert_eq!(next, now + Duration::days(1));
    }

    #[test]
    fn test_review_quality_parsing() {
        assert_eq!("know".parse::<ReviewQuality>().unwrap(), ReviewQuality::Know);
        assert_eq!(
            "forgot".parse::<ReviewQuality>().unwrap(),
            ReviewQuality::Forgot
        );
        assert!("hard".parse::<ReviewQuality>().is_err());
    }
}
