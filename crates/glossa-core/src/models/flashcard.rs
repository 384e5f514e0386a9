use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use utoipa::ToSchema;
use uuid::Uuid;

/// Review maturity of a flashcard. Bounded 0-5; stored as an integer column
/// but modeled as an enum so every mutation goes through an explicit
/// transition instead of unguarded arithmetic.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
    ToSchema,
)]
#[serde(into = "i32", try_from = "i32")]
pub enum LearningStage {
    #[default]
    New = 0,
    Learning1 = 1,
    Learning2 = 2,
    Review1 = 3,
    Review2 = 4,
    Mastered = 5,
}

impl LearningStage {
    pub fn as_i32(&self) -> i32 {
        *self as i32
    }

    /// Clamping conversion; out-of-range values snap to the nearest bound.
    pub fn from_i32(value: i32) -> Self {
        match value {
            i32::MIN..=0 => LearningStage::New,
            1 => LearningStage::Learning1,
            2 => LearningStage::Learning2,
            3 => LearningStage::Review1,
            4 => LearningStage::Review2,
            _ => LearningStage::Mastered,
        }
    }

    /// Next stage after a successful review. Caps at `Mastered`.
    pub fn advance(&self) -> Self {
        Self::from_i32(self.as_i32() + 1)
    }

    /// Stage after a failed review: full reset, not a decrement.
    pub fn reset(&self) -> Self {
        LearningStage::New
    }

    /// Presentation band for this stage.
    pub fn label(&self) -> &'static str {
        match self {
            LearningStage::New => "New",
            LearningStage::Learning1 | LearningStage::Learning2 => "Learning",
            LearningStage::Review1 | LearningStage::Review2 => "Review",
            LearningStage::Mastered => "Mastered",
        }
    }
}

impl Display for LearningStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_i32())
    }
}

impl From<LearningStage> for i32 {
    fn from(stage: LearningStage) -> Self {
        stage as i32
    }
}

impl TryFrom<i32> for LearningStage {
    type Error = anyhow::Error;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        if (0..=5).contains(&value) {
            Ok(LearningStage::from_i32(value))
        } else {
            Err(anyhow::anyhow!("Learning stage out of range: {}", value))
        }
    }
}

/// One vocabulary item derived from a material.
///
/// `next_review_at` is always set, even at stage 0 (due immediately).
/// The scheduler is the only writer of `stage` and `next_review_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flashcard {
    pub id: Uuid,
    pub material_id: Uuid,
    pub user_id: Uuid,
    pub term: String,
    pub translation: String,
    pub definition: Option<String>,
    pub context_snippet: Option<String>,
    pub grammar_note: Option<String>,
    pub stage: LearningStage,
    pub next_review_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl sqlx::FromRow<'_, sqlx::postgres::PgRow> for Flashcard {
    fn from_row(row: &sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;
        Ok(Flashcard {
            id: row.try_get("id")?,
            material_id: row.try_get("material_id")?,
            user_id: row.try_get("user_id")?,
            term: row.try_get("term")?,
            translation: row.try_get("translation")?,
            definition: row.try_get("definition")?,
            context_snippet: row.try_get("context_snippet")?,
            grammar_note: row.try_get("grammar_note")?,
            stage: LearningStage::from_i32(row.try_get::<i32, _>("stage")?),
            next_review_at: row.try_get("next_review_at")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Vocabulary entry produced by the content-generation collaborator,
/// before persistence assigns identity and scheduling state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FlashcardDraft {
    pub term: String,
    pub translation: String,
    #[serde(default)]
    pub definition: Option<String>,
    #[serde(default)]
    pub context_snippet: Option<String>,
    #[serde(default)]
    pub grammar_note: Option<String>,
}

/// Response models for API endpoints (wire names follow the client contract)
#[derive(Debug, Serialize, ToSchema)]
pub struct FlashcardResponse {
    pub id: Uuid,
    pub material_id: Uuid,
    pub user_id: Uuid,
    pub term: String,
    pub translation: String,
    pub definition: Option<String>,
    pub context_original: Option<String>,
    pub grammar_note: Option<String>,
    pub learning_stage: i32,
    pub next_review_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<Flashcard> for FlashcardResponse {
    fn from(card: Flashcard) -> Self {
        Self {
            id: card.id,
            material_id: card.material_id,
            user_id: card.user_id,
            term: card.term,
            translation: card.translation,
            definition: card.definition,
            context_original: card.context_snippet,
            grammar_note: card.grammar_note,
            learning_stage: card.stage.as_i32(),
            next_review_at: card.next_review_at,
            created_at: card.created_at,
        }
    }
}

/// Outcome of a single review submission.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReviewOutcome {
    pub id: Uuid,
    pub learning_stage: i32,
    pub next_review_at: DateTime<Utc>,
}

impl From<&Flashcard> for ReviewOutcome {
    fn from(card: &Flashcard) -> Self {
        Self {
            id: card.id,
            learning_stage: card.stage.as_i32(),
            next_review_at: card.next_review_at,
        }
    }
}

/// Aggregate review statistics, derived on read and never stored.
#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
pub struct ReviewStats {
    pub total_cards: i64,
    pub due_for_review: i64,
    pub new_cards: i64,
    pub learning: i64,
    pub mastered: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_as_i32() {
        assert_eq!(LearningStage::New.as_i32(), 0);
        assert_eq!(LearningStage::Learning2.as_i32(), 2);
        assert_eq!(LearningStage::Mastered.as_i32(), 5);
    }

    #[test]
    fn test_stage_from_i32_clamps() {
        assert_eq!(LearningStage::from_i32(-3), LearningStage::New);
        assert_eq!(LearningStage::from_i32(0), LearningStage::New);
        assert_eq!(LearningStage::from_i32(3), LearningStage::Review1);
        assert_eq!(LearningStage::from_i32(5), LearningStage::Mastered);
        assert_eq!(LearningStage::from_i32(42), LearningStage::Mastered);
    }

    #[test]
    fn test_stage_advance_caps_at_mastered() {
        assert_eq!(LearningStage::New.advance(), LearningStage::Learning1);
        assert_eq!(LearningStage::Review2.advance(), LearningStage::Mastered);
        assert_eq!(LearningStage::Mastered.advance(), LearningStage::Mastered);
    }

    #[test]
    fn test_stage_reset_is_total() {
        for stage in 0..=5 {
            assert_eq!(LearningStage::from_i32(stage).reset(), LearningStage::New);
        }
    }

    #[test]
    fn test_stage_labels() {
        assert_eq!(LearningStage::New.label(), "New");
        assert_eq!(LearningStage::Learning1.label(), "Learning");
        assert_eq!(LearningStage::Learning2.label(), "Learning");
        assert_eq!(LearningStage::Review1.label(), "Review");
        assert_eq!(LearningStage::Review2.label(), "Review");
        assert_eq!(LearningStage::Mastered.label(), "Mastered");
    }

    #[test]
    fn test_stage_serializes_as_integer() {
        let json = serde_json::to_string(&LearningStage::Review1).unwrap();
        assert_eq!(json, "3");
        let stage: LearningStage = serde_json::from_str("5").unwrap();
        assert_eq!(stage, LearningStage::Mastered);
        assert!(serde_json::from_str::<LearningStage>("6").is_err());
    }

    #[test]
    fn test_stage_ordering() {
        assert!(LearningStage::New < LearningStage::Learning1);
        assert!(LearningStage::Review2 < LearningStage::Mastered);
    }

    #[test]
    fn test_flashcard_response_wire_names() {
        let card = Flashcard {
            id: Uuid::new_v4(),
            material_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            term: "la biblioteca".to_string(),
            translation: "the library".to_string(),
            definition: None,
            context_snippet: Some("Voy a la biblioteca".to_string()),
            grammar_note: Some("feminine noun".to_string()),
            stage: LearningStage::Learning2,
            next_review_at: Utc::now(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_value(FlashcardResponse::from(card)).unwrap();
        assert_eq!(json["learning_stage"], 2);
        assert_eq!(json["context_original"], "Voy a la biblioteca");
        assert_eq!(json["term"], "la biblioteca");
    }
}
