//! Questions and question-bank validation.

use std::collections::HashSet;
use std::time::Duration;

use chrono::TimeDelta;
use quizrun_core::error::DomainError;
use serde::{Deserialize, Serialize};

/// Longest answer window a single question may ask for.
pub const MAX_TIME_LIMIT_MS: u64 = 60 * 60 * 1000;

/// One selectable answer of a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOption {
    /// Option identifier, unique within its question.
    pub id: String,
    /// Text shown to participants.
    pub text: String,
}

impl AnswerOption {
    /// Creates an answer option.
    #[must_use]
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// A question from the bank, fixed for the lifetime of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Question identifier in the external question bank.
    pub id: String,
    /// Prompt text. A blank prompt makes the question unplayable.
    pub prompt: String,
    /// Answer options in presentation order.
    pub options: Vec<AnswerOption>,
    /// Id of the option that scores.
    pub correct_answer_id: String,
    /// Answer window in milliseconds.
    pub time_limit_ms: u64,
    /// Explanation revealed after the round.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    /// Image shown with the prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_image_url: Option<String>,
    /// Image shown with the explanation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation_image_url: Option<String>,
}

impl Question {
    /// Returns `true` when the prompt has visible text.
    #[must_use]
    pub fn has_prompt(&self) -> bool {
        !self.prompt.trim().is_empty()
    }

    /// Returns `true` when `answer_id` names the correct option.
    #[must_use]
    pub fn is_correct(&self, answer_id: &str) -> bool {
        self.correct_answer_id == answer_id
    }

    /// Looks up an option by id.
    #[must_use]
    pub fn option(&self, answer_id: &str) -> Option<&AnswerOption> {
        self.options.iter().find(|o| o.id == answer_id)
    }

    /// Returns the correct option, if the question references one it carries.
    #[must_use]
    pub fn correct_answer(&self) -> Option<&AnswerOption> {
        self.option(&self.correct_answer_id)
    }

    /// Returns the answer window.
    #[must_use]
    pub fn time_limit(&self) -> Duration {
        Duration::from_millis(self.time_limit_ms.min(MAX_TIME_LIMIT_MS))
    }

    /// Returns the answer window as a calendar offset, capped at
    /// [`MAX_TIME_LIMIT_MS`].
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub fn time_budget(&self) -> TimeDelta {
        TimeDelta::milliseconds(self.time_limit_ms.min(MAX_TIME_LIMIT_MS) as i64)
    }

    /// Checks the question can be played.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` describing the first problem found:
    /// a blank prompt, no options, duplicate option ids, a correct answer id
    /// that names no option, or a time limit outside `1..=MAX_TIME_LIMIT_MS`.
    pub fn validate(&self) -> Result<(), DomainError> {
        if !self.has_prompt() {
            return Err(DomainError::Validation(format!(
                "question {} has blank prompt text",
                self.id
            )));
        }
        if self.options.is_empty() {
            return Err(DomainError::Validation(format!(
                "question {} has no answer options",
                self.id
            )));
        }
        let mut seen = HashSet::new();
        if let Some(duplicate) = self.options.iter().find(|o| !seen.insert(o.id.as_str())) {
            return Err(DomainError::Validation(format!(
                "question {} repeats answer option id {}",
                self.id, duplicate.id
            )));
        }
        if self.correct_answer().is_none() {
            return Err(DomainError::Validation(format!(
                "question {} names correct answer {} which is not one of its options",
                self.id, self.correct_answer_id
            )));
        }
        if self.time_limit_ms == 0 || self.time_limit_ms > MAX_TIME_LIMIT_MS {
            return Err(DomainError::Validation(format!(
                "question {} has time limit {}ms; expected 1..={MAX_TIME_LIMIT_MS}ms",
                self.id, self.time_limit_ms
            )));
        }
        Ok(())
    }
}

/// Checks that a bank can start a session: it must be non-empty and every
/// question in it must be playable.
///
/// # Errors
///
/// Returns `DomainError::Validation` for an empty bank, or the first
/// question-level problem prefixed with the question's 1-based position.
pub fn validate_bank(questions: &[Question]) -> Result<(), DomainError> {
    if questions.is_empty() {
        return Err(DomainError::Validation(
            "question bank is empty".to_owned(),
        ));
    }
    for (position, question) in questions.iter().enumerate() {
        question.validate().map_err(|err| match err {
            DomainError::Validation(reason) => {
                DomainError::Validation(format!("question #{}: {reason}", position + 1))
            }
            other => other,
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capital_question() -> Question {
        Question {
            id: "q1".to_owned(),
            prompt: "What is the capital of France?".to_owned(),
            options: vec![
                AnswerOption::new("paris", "Paris"),
                AnswerOption::new("lyon", "Lyon"),
            ],
            correct_answer_id: "paris".to_owned(),
            time_limit_ms: 5000,
            explanation: None,
            prompt_image_url: None,
            explanation_image_url: None,
        }
    }

    #[test]
    fn test_valid_question_passes_validation() {
        assert!(capital_question().validate().is_ok());
    }

    #[test]
    fn test_blank_prompt_is_rejected() {
        let mut question = capital_question();
        question.prompt = "   ".to_owned();

        let err = question.validate().unwrap_err();

        assert!(matches!(err, DomainError::Validation(msg) if msg.contains("blank prompt")));
    }

    #[test]
    fn test_correct_answer_must_be_an_option() {
        let mut question = capital_question();
        question.correct_answer_id = "marseille".to_owned();

        let err = question.validate().unwrap_err();

        assert!(matches!(err, DomainError::Validation(msg) if msg.contains("marseille")));
    }

    #[test]
    fn test_duplicate_option_ids_are_rejected() {
        let mut question = capital_question();
        question.options.push(AnswerOption::new("paris", "Paris again"));

        let err = question.validate().unwrap_err();

        assert!(matches!(err, DomainError::Validation(msg) if msg.contains("repeats")));
    }

    #[test]
    fn test_zero_time_limit_is_rejected() {
        let mut question = capital_question();
        question.time_limit_ms = 0;

        assert!(question.validate().is_err());
    }

    #[test]
    fn test_empty_bank_is_rejected() {
        let err = validate_bank(&[]).unwrap_err();

        assert!(matches!(err, DomainError::Validation(msg) if msg == "question bank is empty"));
    }

    #[test]
    fn test_bank_error_names_question_position() {
        let mut blank = capital_question();
        blank.id = "q2".to_owned();
        blank.prompt = String::new();

        let err = validate_bank(&[capital_question(), blank]).unwrap_err();

        assert!(matches!(err, DomainError::Validation(msg) if msg.starts_with("question #2:")));
    }

    #[test]
    fn test_time_budget_is_capped() {
        let mut question = capital_question();
        question.time_limit_ms = u64::MAX;

        assert_eq!(
            question.time_budget(),
            TimeDelta::milliseconds(3_600_000)
        );
        assert_eq!(question.time_limit(), Duration::from_secs(3600));
    }
}
