//! Collaborators the quiz context drives but does not implement.

use async_trait::async_trait;
use quizrun_core::error::DomainError;
use uuid::Uuid;

use crate::domain::aggregates::QuizSession;
use crate::domain::leaderboard::Leaderboard;
use crate::domain::question::Question;
use crate::domain::session_key::SessionKey;
use crate::domain::signal::Signal;

/// Renders session progress to the chat channel.
///
/// Calls are fire-and-forget from the session's point of view: the round
/// resolver logs a returned error and carries on.
#[async_trait]
pub trait PresentationSink: Send + Sync {
    /// Shows a question to the channel.
    async fn publish_question(
        &self,
        session: &QuizSession,
        question: &Question,
    ) -> Result<(), DomainError>;

    /// Shows the current round tally. `round_number` is 1-based.
    async fn publish_round_summary(
        &self,
        session: &QuizSession,
        question: &Question,
        round_number: usize,
    ) -> Result<(), DomainError>;

    /// Shows the final standings.
    async fn publish_leaderboard(
        &self,
        session: &QuizSession,
        leaderboard: &Leaderboard,
    ) -> Result<(), DomainError>;
}

/// Creates and ends sessions on the durable-execution substrate.
#[async_trait]
pub trait SessionRegistry: Send + Sync {
    /// Starts a driver for `key` with an already validated bank, ending any
    /// session the key still has.
    async fn start_session(
        &self,
        key: &SessionKey,
        questions: Vec<Question>,
        correlation_id: Uuid,
    ) -> Result<(), DomainError>;

    /// Forcefully ends the session for `key`.
    ///
    /// Returns `DomainError::NoActiveSession` when the key has none.
    async fn terminate_session(&self, key: &SessionKey, reason: &str) -> Result<(), DomainError>;

    /// Returns `true` while a driver owns `key`.
    async fn is_running(&self, key: &SessionKey) -> bool;
}

/// Delivers signals to running sessions.
#[async_trait]
pub trait SignalBus: Send + Sync {
    /// Raises `signal` against the session for `key`.
    ///
    /// Returns `DomainError::NoActiveSession` when the key has no session and
    /// `DomainError::SignalDelivery` when it has one that can no longer
    /// receive signals.
    async fn raise_signal(&self, key: &SessionKey, signal: Signal) -> Result<(), DomainError>;
}
