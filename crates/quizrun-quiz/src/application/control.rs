//! Session control surface, as called by external command handlers.
//!
//! Every operation answers with a [`ControlResponse`]; none of them return
//! an error to the caller.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use quizrun_core::command::Command;
use quizrun_core::error::DomainError;
use tracing::{debug, info, instrument, warn};

use super::ports::{SessionRegistry, SignalBus};
use crate::domain::commands::{SkipQuestion, StartQuiz, StopQuiz, SubmitAnswer};
use crate::domain::question::validate_bank;
use crate::domain::signal::Signal;

/// Reason recorded when a new quiz replaces a running one.
pub const SUPERSEDED_REASON: &str = "superseded by a new quiz";

/// Reason recorded when a stop could not be delivered as a cancel signal.
pub const FORCED_STOP_REASON: &str = "stop requested; cancel signal undeliverable";

/// Outcome of a control operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlResponse {
    /// The request was carried out (or was a harmless no-op).
    Accepted,
    /// The request needs a running quiz and the channel has none.
    NoActiveQuiz,
    /// The request was invalid and nothing was changed.
    Rejected(String),
    /// The request was valid but could not be completed.
    Failed(String),
}

impl fmt::Display for ControlResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Accepted => f.write_str("accepted"),
            Self::NoActiveQuiz => f.write_str("no active quiz"),
            Self::Rejected(reason) => write!(f, "rejected: {reason}"),
            Self::Failed(reason) => write!(f, "could not complete: {reason}"),
        }
    }
}

/// The operations a front end may perform on quiz sessions.
#[async_trait]
pub trait QuizControl: Send + Sync {
    /// Validates the bank and starts a quiz, replacing any running one.
    async fn start(&self, command: &StartQuiz) -> ControlResponse;

    /// Cancels the running quiz. Stopping a channel without one is accepted.
    async fn stop(&self, command: &StopQuiz) -> ControlResponse;

    /// Skips the current question. Skipping a channel without a quiz is
    /// accepted.
    async fn skip(&self, command: &SkipQuestion) -> ControlResponse;

    /// Submits an answer to the current question.
    async fn submit_answer(&self, command: &SubmitAnswer) -> ControlResponse;
}

/// [`QuizControl`] over a session registry and signal bus.
#[derive(Clone)]
pub struct DurableQuizControl {
    registry: Arc<dyn SessionRegistry>,
    signals: Arc<dyn SignalBus>,
}

impl fmt::Debug for DurableQuizControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DurableQuizControl").finish_non_exhaustive()
    }
}

impl DurableQuizControl {
    /// Creates a control surface.
    #[must_use]
    pub fn new(registry: Arc<dyn SessionRegistry>, signals: Arc<dyn SignalBus>) -> Self {
        Self { registry, signals }
    }
}

#[async_trait]
impl QuizControl for DurableQuizControl {
    #[instrument(
        skip(self, command),
        fields(
            guild_id = %command.key.guild_id,
            channel_id = %command.key.channel_id,
            correlation_id = %command.correlation_id,
        )
    )]
    async fn start(&self, command: &StartQuiz) -> ControlResponse {
        info!(
            command = command.command_type(),
            questions = command.questions.len(),
            "handling start command"
        );

        if let Err(err) = validate_bank(&command.questions) {
            info!(error = %err, "rejecting question bank");
            return ControlResponse::Rejected(match err {
                DomainError::Validation(reason) => reason,
                other => other.to_string(),
            });
        }

        if self.registry.is_running(&command.key).await {
            match self
                .registry
                .terminate_session(&command.key, SUPERSEDED_REASON)
                .await
            {
                Ok(()) | Err(DomainError::NoActiveSession(_)) => {}
                Err(err) => warn!(error = %err, "could not terminate previous session"),
            }
        }

        match self
            .registry
            .start_session(&command.key, command.questions.clone(), command.correlation_id)
            .await
        {
            Ok(()) => ControlResponse::Accepted,
            Err(err) => {
                warn!(error = %err, "could not start session");
                ControlResponse::Failed(err.to_string())
            }
        }
    }

    #[instrument(
        skip(self, command),
        fields(
            guild_id = %command.key.guild_id,
            channel_id = %command.key.channel_id,
            correlation_id = %command.correlation_id,
        )
    )]
    async fn stop(&self, command: &StopQuiz) -> ControlResponse {
        info!(command = command.command_type(), "handling stop command");

        let err = match self.signals.raise_signal(&command.key, Signal::Cancel).await {
            Ok(()) | Err(DomainError::NoActiveSession(_)) => return ControlResponse::Accepted,
            Err(err) => err,
        };

        warn!(error = %err, "cancel signal failed; forcing termination");
        match self
            .registry
            .terminate_session(&command.key, FORCED_STOP_REASON)
            .await
        {
            Ok(()) | Err(DomainError::NoActiveSession(_)) => ControlResponse::Accepted,
            Err(err) => {
                warn!(error = %err, "forced termination failed");
                ControlResponse::Failed(err.to_string())
            }
        }
    }

    #[instrument(
        skip(self, command),
        fields(
            guild_id = %command.key.guild_id,
            channel_id = %command.key.channel_id,
            correlation_id = %command.correlation_id,
        )
    )]
    async fn skip(&self, command: &SkipQuestion) -> ControlResponse {
        info!(command = command.command_type(), "handling skip command");

        match self.signals.raise_signal(&command.key, Signal::Skip).await {
            Ok(()) => ControlResponse::Accepted,
            // A driver that already exited no longer takes signals; there
            // is nothing left to skip.
            Err(DomainError::NoActiveSession(_) | DomainError::SignalDelivery(_)) => {
                debug!("no session to skip");
                ControlResponse::Accepted
            }
            Err(err) => {
                warn!(error = %err, "skip signal failed");
                ControlResponse::Failed(err.to_string())
            }
        }
    }

    #[instrument(
        skip(self, command),
        fields(
            guild_id = %command.key.guild_id,
            channel_id = %command.key.channel_id,
            correlation_id = %command.correlation_id,
            user_id = %command.user_id,
        )
    )]
    async fn submit_answer(&self, command: &SubmitAnswer) -> ControlResponse {
        debug!(command = command.command_type(), "handling answer");

        let signal = Signal::answer(&command.user_id, &command.answer_id);
        match self.signals.raise_signal(&command.key, signal).await {
            Ok(()) => ControlResponse::Accepted,
            Err(DomainError::NoActiveSession(_) | DomainError::SignalDelivery(_)) => {
                ControlResponse::NoActiveQuiz
            }
            Err(err) => {
                warn!(error = %err, "answer could not be delivered");
                ControlResponse::Failed(err.to_string())
            }
        }
    }
}
