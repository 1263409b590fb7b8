//! Signals delivered to a running session.

use quizrun_core::error::DomainError;
use serde::{Deserialize, Serialize};

/// An asynchronous input raised against a running session by name.
///
/// Answer payloads are carried as raw JSON because they originate outside the
/// session and are only validated when the round consumes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "signal", content = "payload", rename_all = "snake_case")]
pub enum Signal {
    /// End the current round early and move to the next question.
    Skip,
    /// End the session.
    Cancel,
    /// A participant answered.
    Answer(serde_json::Value),
}

impl Signal {
    /// Builds a well-formed answer signal.
    #[must_use]
    pub fn answer(user_id: &str, answer_id: &str) -> Self {
        Self::Answer(serde_json::json!({
            "user_id": user_id,
            "answer_id": answer_id,
        }))
    }

    /// Returns the signal name used in logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Skip => "skip",
            Self::Cancel => "cancel",
            Self::Answer(_) => "answer",
        }
    }
}

/// A validated answer: who answered and which option they picked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerSubmission {
    /// The participant.
    pub user_id: String,
    /// The selected option id.
    pub answer_id: String,
}

impl AnswerSubmission {
    /// Parses an answer signal payload.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::MalformedEvent` when the payload is not an object
    /// carrying non-blank `user_id` and `answer_id` strings.
    pub fn from_payload(payload: &serde_json::Value) -> Result<Self, DomainError> {
        let submission: Self = serde_json::from_value(payload.clone())
            .map_err(|e| DomainError::MalformedEvent(format!("answer payload: {e}")))?;
        if submission.user_id.trim().is_empty() {
            return Err(DomainError::MalformedEvent(
                "answer payload has a blank user_id".to_owned(),
            ));
        }
        if submission.answer_id.trim().is_empty() {
            return Err(DomainError::MalformedEvent(
                "answer payload has a blank answer_id".to_owned(),
            ));
        }
        Ok(submission)
    }
}
