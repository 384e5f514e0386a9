use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    MultipleChoice,
    TrueFalse,
    FillBlank,
}

impl Display for QuestionKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            QuestionKind::MultipleChoice => write!(f, "multiple_choice"),
            QuestionKind::TrueFalse => write!(f, "true_false"),
            QuestionKind::FillBlank => write!(f, "fill_blank"),
        }
    }
}

impl FromStr for QuestionKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "multiple_choice" => Ok(QuestionKind::MultipleChoice),
            "true_false" => Ok(QuestionKind::TrueFalse),
            "fill_blank" => Ok(QuestionKind::FillBlank),
            _ => Err(anyhow::anyhow!("Invalid question kind: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct QuizOption {
    pub text: String,
    pub is_correct: bool,
}

/// One generated question. Serialized verbatim into the quiz's JSONB column
/// and onto the wire, so field names follow the client contract.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct QuizQuestion {
    #[serde(rename = "question")]
    pub prompt: String,
    #[serde(rename = "question_type")]
    pub kind: QuestionKind,
    /// Populated for multiple-choice only; empty otherwise.
    #[serde(default)]
    pub options: Vec<QuizOption>,
    pub correct_answer: String,
    pub explanation: String,
}

/// One generated assessment tied to a material.
///
/// `score` is set exactly when `completed_at` is set; a quiz is immutable
/// after its first successful submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quiz {
    pub id: Uuid,
    pub material_id: Uuid,
    pub user_id: Uuid,
    pub questions: Vec<QuizQuestion>,
    pub score: Option<i32>,
    pub total_questions: i32,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl sqlx::FromRow<'_, sqlx::postgres::PgRow> for Quiz {
    fn from_row(row: &sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;
        let questions: serde_json::Value = row.try_get("questions")?;
        Ok(Quiz {
            id: row.try_get("id")?,
            material_id: row.try_get("material_id")?,
            user_id: row.try_get("user_id")?,
            questions: serde_json::from_value(questions).map_err(|e| {
                sqlx::Error::Decode(format!("Failed to parse quiz questions: {}", e).into())
            })?,
            score: row.try_get("score")?,
            total_questions: row.try_get("total_questions")?,
            completed_at: row.try_get("completed_at")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl Quiz {
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}

/// Response models for API endpoints
#[derive(Debug, Serialize, ToSchema)]
pub struct QuizResponse {
    pub id: Uuid,
    pub material_id: Uuid,
    pub questions: Vec<QuizQuestion>,
    pub score: Option<i32>,
    pub total_questions: i32,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<Quiz> for QuizResponse {
    fn from(quiz: Quiz) -> Self {
        Self {
            id: quiz.id,
            material_id: quiz.material_id,
            questions: quiz.questions,
            score: quiz.score,
            total_questions: quiz.total_questions,
            completed_at: quiz.completed_at,
            created_at: quiz.created_at,
        }
    }
}

/// Per-question grading detail returned from a submission. Recomputed from
/// the stored quiz plus the submitted answers; never persisted.
#[derive(Debug, Clone, Serialize, PartialEq, Eq, ToSchema)]
pub struct AnswerResult {
    pub question_index: usize,
    pub question: String,
    pub user_answer: String,
    pub correct_answer: String,
    pub is_correct: bool,
    pub explanation: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct QuizSubmissionResult {
    pub quiz_id: Uuid,
    pub score: i32,
    pub total_questions: i32,
    pub results: Vec<AnswerResult>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_question() -> QuizQuestion {
        QuizQuestion {
            prompt: "What does 'gato' mean?".to_string(),
            kind: QuestionKind::MultipleChoice,
            options: vec![
                QuizOption {
                    text: "cat".to_string(),
                    is_correct: true,
                },
                QuizOption {
                    text: "dog".to_string(),
                    is_correct: false,
                },
            ],
            correct_answer: "cat".to_string(),
            explanation: "'Gato' is Spanish for cat.".to_string(),
        }
    }

    #[test]
    fn test_question_kind_display_round_trip() {
        for kind in [
            QuestionKind::MultipleChoice,
            QuestionKind::TrueFalse,
            QuestionKind::FillBlank,
        ] {
            assert_eq!(kind.to_string().parse::<QuestionKind>().unwrap(), kind);
        }
        assert!("essay".parse::<QuestionKind>().is_err());
    }

    #[test]
    fn test_question_wire_names() {
        let json = serde_json::to_value(sample_question()).unwrap();
        assert_eq!(json["question"], "What does 'gato' mean?");
        assert_eq!(json["question_type"], "multiple_choice");
        assert_eq!(json["options"][0]["is_correct"], true);
    }

    #[test]
    fn test_question_options_default_to_empty() {
        let json = serde_json::json!({
            "question": "True or false: 'perro' means dog",
            "question_type": "true_false",
            "correct_answer": "true",
            "explanation": "'Perro' is Spanish for dog."
        });
        let question: QuizQuestion = serde_json::from_value(json).unwrap();
        assert!(question.options.is_empty());
        assert_eq!(question.kind, QuestionKind::TrueFalse);
    }

    #[test]
    fn test_quiz_completion_invariant() {
        let quiz = Quiz {
            id: Uuid::new_v4(),
            material_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            questions: vec![sample_question()],
            score: None,
            total_questions: 1,
            completed_at: None,
            created_at: Utc::now(),
        };
        assert!(!quiz.is_completed());
        assert_eq!(quiz.score.is_some(), quiz.completed_at.is_some());
    }
}
