//! Query handlers for the quiz context.
//!
//! This module contains query handlers that reconstitute sessions from
//! stored events and return read-only view DTOs.

use std::collections::{BTreeMap, BTreeSet};

use quizrun_core::error::DomainError;
use quizrun_core::repository::EventRepository;
use serde::Serialize;
use uuid::Uuid;

use crate::application::journal;
use crate::domain::aggregates::{QuizSession, SessionStatus};
use crate::domain::leaderboard::Leaderboard;
use crate::domain::round::RoundState;
use crate::domain::session_key::SessionKey;

/// Read-only view of a quiz session.
#[derive(Debug, Clone, Serialize)]
pub struct QuizSessionView {
    /// The session stream identifier.
    pub stream_id: Uuid,
    /// The guild and channel the session belongs to.
    pub key: Option<SessionKey>,
    /// Run counter within the stream.
    pub run: u32,
    /// Lifecycle of the current run.
    pub status: SessionStatus,
    /// Position of the question in play, if a round is open.
    pub current_question_index: Option<usize>,
    /// Phase of the round in play.
    pub round_state: Option<RoundState>,
    /// Size of the bank.
    pub question_count: usize,
    /// Cumulative points per participant.
    pub scores: BTreeMap<String, u32>,
    /// Participants who answered correctly in the current round.
    pub round_correct: BTreeSet<String>,
    /// Participants who answered in the current round.
    pub round_answered: BTreeSet<String>,
    /// Final standings once the run completed.
    pub leaderboard: Option<Leaderboard>,
    /// Current version (event count).
    pub version: i64,
}

impl From<&QuizSession> for QuizSessionView {
    fn from(session: &QuizSession) -> Self {
        Self {
            stream_id: session.id,
            key: session.key.clone(),
            run: session.run,
            status: session.status,
            current_question_index: session.round.as_ref().map(|r| r.question_index),
            round_state: session.round.as_ref().map(|r| r.state),
            question_count: session.questions.len(),
            scores: session.scores.clone(),
            round_correct: session.round_correct.clone(),
            round_answered: session.round_answered.clone(),
            leaderboard: session.leaderboard.clone(),
            version: session.version,
        }
    }
}

/// Retrieves the session for a (guild, channel) key.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if the key never had a session.
/// Returns `DomainError::Infrastructure` if event deserialization fails.
pub async fn get_quiz_session(
    key: &SessionKey,
    repo: &dyn EventRepository,
) -> Result<QuizSessionView, DomainError> {
    let stream_id = key.stream_id();
    let stored_events = repo.load_events(stream_id).await?;
    if stored_events.is_empty() {
        return Err(DomainError::AggregateNotFound(stream_id));
    }
    let session = journal::reconstitute(stream_id, &stored_events)?;
    Ok(QuizSessionView::from(&session))
}
