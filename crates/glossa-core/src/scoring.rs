//! Quiz answer grading.
//!
//! One comparison rule for every question type: the submitted string equals
//! the canonical answer after trimming and lowercasing. No fuzzy or partial
//! credit; near-miss answers (plurals, typos) are wrong by contract.

use crate::error::AppError;
use crate::models::{AnswerResult, QuizQuestion};

/// Canonical form used for answer comparison.
pub fn normalize_answer(answer: &str) -> String {
    answer.trim().to_lowercase()
}

/// Whether a submitted answer matches the question's canonical answer.
pub fn is_correct(question: &QuizQuestion, answer: &str) -> bool {
    normalize_answer(answer) == normalize_answer(&question.correct_answer)
}

/// Grade a full submission. Requires exactly one answer per question;
/// returns the score plus a per-question breakdown in question order.
pub fn grade_submission(
    questions: &[QuizQuestion],
    answers: &[String],
) -> Result<(i32, Vec<AnswerResult>), AppError> {
    if answers.len() != questions.len() {
        return Err(AppError::InvalidAnswerCount {
            expected: questions.len(),
            received: answers.len(),
        });
    }

    let mut score = 0;
    let mut results = Vec::with_capacity(questions.len());
    for (index, (question, answer)) in questions.iter().zip(answers.iter()).enumerate() {
        let correct = is_correct(question, answer);
        if correct {
            score += 1;
        }
        results.push(AnswerResult {
            question_index: index,
            question: question.prompt.clone(),
            user_answer: answer.clone(),
            correct_answer: question.correct_answer.clone(),
            is_correct: correct,
            explanation: question.explanation.clone(),
        });
    }

    Ok((score, results))
}
