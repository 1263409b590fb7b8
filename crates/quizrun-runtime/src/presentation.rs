//! A presentation sink that writes publications to the log.

use async_trait::async_trait;
use quizrun_core::error::DomainError;
use quizrun_quiz::application::ports::PresentationSink;
use quizrun_quiz::domain::aggregates::QuizSession;
use quizrun_quiz::domain::leaderboard::Leaderboard;
use quizrun_quiz::domain::question::Question;
use tracing::info;

/// Renders questions, round summaries and leaderboards as structured
/// `info!` records, one per publication.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingPresentationSink;

impl TracingPresentationSink {
    /// Creates the sink.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn channel(session: &QuizSession) -> (&str, &str) {
    session
        .key
        .as_ref()
        .map_or(("", ""), |key| (key.guild_id.as_str(), key.channel_id.as_str()))
}

fn options(question: &Question) -> String {
    question
        .options
        .iter()
        .map(|option| format!("[{}] {}", option.id, option.text))
        .collect::<Vec<_>>()
        .join(" ")
}

#[async_trait]
impl PresentationSink for TracingPresentationSink {
    async fn publish_question(
        &self,
        session: &QuizSession,
        question: &Question,
    ) -> Result<(), DomainError> {
        let (guild_id, channel_id) = channel(session);
        info!(
            guild_id,
            channel_id,
            question_id = %question.id,
            time_limit_ms = question.time_limit_ms,
            image = question.prompt_image_url.as_deref(),
            options = %options(question),
            "{}",
            question.prompt
        );
        Ok(())
    }

    async fn publish_round_summary(
        &self,
        session: &QuizSession,
        question: &Question,
        round_number: usize,
    ) -> Result<(), DomainError> {
        let (guild_id, channel_id) = channel(session);
        let correct: Vec<&str> = session.round_correct.iter().map(String::as_str).collect();
        let answer = question
            .correct_answer()
            .map_or(question.correct_answer_id.as_str(), |option| option.text.as_str());
        info!(
            guild_id,
            channel_id,
            question_id = %question.id,
            round_number,
            answer,
            correct = %correct.join(", "),
            answered = session.round_answered.len(),
            explanation = question.explanation.as_deref(),
            "round {round_number} summary"
        );
        Ok(())
    }

    async fn publish_leaderboard(
        &self,
        session: &QuizSession,
        leaderboard: &Leaderboard,
    ) -> Result<(), DomainError> {
        let (guild_id, channel_id) = channel(session);
        for line in leaderboard.to_string().lines() {
            info!(guild_id, channel_id, "{line}");
        }
        Ok(())
    }
}
