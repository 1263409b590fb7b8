//! Commands for the quiz context, as issued by external command handlers.

use quizrun_core::command::Command;
use uuid::Uuid;

use super::question::Question;
use super::session_key::SessionKey;

/// Command to start a quiz in a channel.
#[derive(Debug, Clone)]
pub struct StartQuiz {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Where the quiz runs.
    pub key: SessionKey,
    /// The question bank to play, in order.
    pub questions: Vec<Question>,
}

impl Command for StartQuiz {
    fn command_type(&self) -> &'static str {
        "quiz.start"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to stop the quiz running in a channel.
#[derive(Debug, Clone)]
pub struct StopQuiz {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The session to stop.
    pub key: SessionKey,
}

impl Command for StopQuiz {
    fn command_type(&self) -> &'static str {
        "quiz.stop"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to skip the current question.
#[derive(Debug, Clone)]
pub struct SkipQuestion {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The session whose round is skipped.
    pub key: SessionKey,
}

impl Command for SkipQuestion {
    fn command_type(&self) -> &'static str {
        "quiz.skip"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to submit a participant's answer to the current question.
#[derive(Debug, Clone)]
pub struct SubmitAnswer {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The session the answer is for.
    pub key: SessionKey,
    /// The participant.
    pub user_id: String,
    /// The selected option id.
    pub answer_id: String,
}

impl Command for SubmitAnswer {
    fn command_type(&self) -> &'static str {
        "quiz.submit_answer"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}
