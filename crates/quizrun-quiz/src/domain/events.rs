//! Domain events for the quiz context.

use chrono::{DateTime, Utc};
use quizrun_core::event::{DomainEvent, EventMetadata};
use serde::{Deserialize, Serialize};

use super::leaderboard::Leaderboard;
use super::question::Question;
use super::round::RoundOutcome;

/// Emitted when a quiz run begins on a session stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizStarted {
    /// The guild the quiz runs in.
    pub guild_id: String,
    /// The channel the quiz runs in.
    pub channel_id: String,
    /// The question bank, fixed for the run.
    pub questions: Vec<Question>,
    /// Run counter within the stream, starting at 1.
    pub run: u32,
}

/// Emitted when a round opens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundStarted {
    /// Position of the question in the bank.
    pub question_index: usize,
    /// When the round opened.
    pub started_at: DateTime<Utc>,
    /// When the answer window closes.
    pub deadline: DateTime<Utc>,
}

/// Emitted once the question has been handed to the presentation sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionPresented {
    /// Position of the question in the bank.
    pub question_index: usize,
}

/// Emitted for every well-formed answer received during a round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerRecorded {
    /// Position of the question in the bank.
    pub question_index: usize,
    /// The participant.
    pub user_id: String,
    /// The selected option id.
    pub answer_id: String,
    /// Whether the selected option is the correct one.
    pub correct: bool,
    /// Whether the answer earned a point.
    pub awarded: bool,
}

/// Emitted when a round stops accepting answers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundEnded {
    /// Position of the question in the bank.
    pub question_index: usize,
    /// `Continue` or `Skip`; cancellation has its own event.
    pub outcome: RoundOutcome,
    /// End of the reveal window, for `Continue` rounds.
    pub reveal_until: Option<DateTime<Utc>>,
}

/// Emitted when the reveal window of a round elapses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevealCompleted {
    /// Position of the question in the bank.
    pub question_index: usize,
}

/// Emitted when a cancel signal ends the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizCancelled {
    /// The question in play when the cancel arrived, if any.
    pub question_index: Option<usize>,
}

/// Emitted when the bank is exhausted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizCompleted {
    /// The published standings.
    pub leaderboard: Leaderboard,
}

/// Emitted when the run is ended from outside the driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizTerminated {
    /// Why the run was terminated.
    pub reason: String,
}

/// Event type identifier for [`QuizStarted`].
pub const QUIZ_STARTED_EVENT_TYPE: &str = "quiz.quiz_started";

/// Event type identifier for [`RoundStarted`].
pub const ROUND_STARTED_EVENT_TYPE: &str = "quiz.round_started";

/// Event type identifier for [`QuestionPresented`].
pub const QUESTION_PRESENTED_EVENT_TYPE: &str = "quiz.question_presented";

/// Event type identifier for [`AnswerRecorded`].
pub const ANSWER_RECORDED_EVENT_TYPE: &str = "quiz.answer_recorded";

/// Event type identifier for [`RoundEnded`].
pub const ROUND_ENDED_EVENT_TYPE: &str = "quiz.round_ended";

/// Event type identifier for [`RevealCompleted`].
pub const REVEAL_COMPLETED_EVENT_TYPE: &str = "quiz.reveal_completed";

/// Event type identifier for [`QuizCancelled`].
pub const QUIZ_CANCELLED_EVENT_TYPE: &str = "quiz.quiz_cancelled";

/// Event type identifier for [`QuizCompleted`].
pub const QUIZ_COMPLETED_EVENT_TYPE: &str = "quiz.quiz_completed";

/// Event type identifier for [`QuizTerminated`].
pub const QUIZ_TERMINATED_EVENT_TYPE: &str = "quiz.quiz_terminated";

/// Event payload variants for the quiz context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum QuizEventKind {
    /// A run has started.
    QuizStarted(QuizStarted),
    /// A round has opened.
    RoundStarted(RoundStarted),
    /// A question was presented.
    QuestionPresented(QuestionPresented),
    /// An answer was recorded.
    AnswerRecorded(AnswerRecorded),
    /// A round has ended.
    RoundEnded(RoundEnded),
    /// A reveal window has elapsed.
    RevealCompleted(RevealCompleted),
    /// The run was cancelled.
    QuizCancelled(QuizCancelled),
    /// The run finished its bank.
    QuizCompleted(QuizCompleted),
    /// The run was terminated from outside.
    QuizTerminated(QuizTerminated),
}

/// Domain event envelope for the quiz context.
#[derive(Debug, Clone)]
pub struct QuizEvent {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Event-specific payload.
    pub kind: QuizEventKind,
}

impl QuizEventKind {
    /// Returns the event type identifier for this payload.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::QuizStarted(_) => QUIZ_STARTED_EVENT_TYPE,
            Self::RoundStarted(_) => ROUND_STARTED_EVENT_TYPE,
            Self::QuestionPresented(_) => QUESTION_PRESENTED_EVENT_TYPE,
            Self::AnswerRecorded(_) => ANSWER_RECORDED_EVENT_TYPE,
            Self::RoundEnded(_) => ROUND_ENDED_EVENT_TYPE,
            Self::RevealCompleted(_) => REVEAL_COMPLETED_EVENT_TYPE,
            Self::QuizCancelled(_) => QUIZ_CANCELLED_EVENT_TYPE,
            Self::QuizCompleted(_) => QUIZ_COMPLETED_EVENT_TYPE,
            Self::QuizTerminated(_) => QUIZ_TERMINATED_EVENT_TYPE,
        }
    }
}

impl DomainEvent for QuizEvent {
    fn event_type(&self) -> &'static str {
        self.kind.event_type()
    }

    fn to_payload(&self) -> serde_json::Value {
        // Serialization of derived Serialize types to Value is infallible.
        serde_json::to_value(&self.kind).expect("QuizEventKind serialization is infallible")
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }
}
