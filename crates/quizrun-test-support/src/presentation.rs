//! Test presentation sinks.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use quizrun_core::error::DomainError;
use quizrun_quiz::application::ports::PresentationSink;
use quizrun_quiz::domain::aggregates::QuizSession;
use quizrun_quiz::domain::leaderboard::Leaderboard;
use quizrun_quiz::domain::question::Question;
use tokio::sync::Notify;

/// One call made to a [`RecordingPresentationSink`], with the session state
/// visible at the time of the call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Publication {
    /// `publish_question`.
    Question {
        /// The question shown.
        question_id: String,
    },
    /// `publish_round_summary`.
    RoundSummary {
        /// The question summarised.
        question_id: String,
        /// 1-based round number.
        round_number: usize,
        /// Participants correct so far this round.
        correct: Vec<String>,
        /// Cumulative scores at the time.
        scores: Vec<(String, u32)>,
    },
    /// `publish_leaderboard`.
    Leaderboard(Leaderboard),
}

/// A presentation sink that records every publication and lets tests wait
/// for them.
#[derive(Debug, Default)]
pub struct RecordingPresentationSink {
    publications: Mutex<Vec<Publication>>,
    published: Notify,
}

impl RecordingPresentationSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all publications so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn publications(&self) -> Vec<Publication> {
        self.publications.lock().unwrap().clone()
    }

    /// Returns how many questions were published.
    pub fn question_count(&self) -> usize {
        self.publications()
            .iter()
            .filter(|p| matches!(p, Publication::Question { .. }))
            .count()
    }

    /// Returns how many round summaries were published.
    pub fn summary_count(&self) -> usize {
        self.publications()
            .iter()
            .filter(|p| matches!(p, Publication::RoundSummary { .. }))
            .count()
    }

    /// Returns the leaderboards published, normally zero or one.
    pub fn leaderboards(&self) -> Vec<Leaderboard> {
        self.publications()
            .into_iter()
            .filter_map(|p| match p {
                Publication::Leaderboard(leaderboard) => Some(leaderboard),
                _ => None,
            })
            .collect()
    }

    /// Waits until at least `count` publications have been recorded and
    /// returns them.
    pub async fn wait_for(&self, count: usize) -> Vec<Publication> {
        loop {
            let notified = self.published.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            let publications = self.publications();
            if publications.len() >= count {
                return publications;
            }
            notified.await;
        }
    }

    fn push(&self, publication: Publication) {
        self.publications.lock().unwrap().push(publication);
        self.published.notify_waiters();
    }
}

#[async_trait]
impl PresentationSink for RecordingPresentationSink {
    async fn publish_question(
        &self,
        _session: &QuizSession,
        question: &Question,
    ) -> Result<(), DomainError> {
        self.push(Publication::Question {
            question_id: question.id.clone(),
        });
        Ok(())
    }

    async fn publish_round_summary(
        &self,
        session: &QuizSession,
        question: &Question,
        round_number: usize,
    ) -> Result<(), DomainError> {
        self.push(Publication::RoundSummary {
            question_id: question.id.clone(),
            round_number,
            correct: session.round_correct.iter().cloned().collect(),
            scores: session
                .scores
                .iter()
                .map(|(user, points)| (user.clone(), *points))
                .collect(),
        });
        Ok(())
    }

    async fn publish_leaderboard(
        &self,
        _session: &QuizSession,
        leaderboard: &Leaderboard,
    ) -> Result<(), DomainError> {
        self.push(Publication::Leaderboard(leaderboard.clone()));
        Ok(())
    }
}

/// A recording sink whose round summaries take a while to publish, like a
/// chat platform that is rate limiting the bot.
#[derive(Debug)]
pub struct SlowSummarySink {
    recorder: RecordingPresentationSink,
    summary_delay: Duration,
}

impl SlowSummarySink {
    /// Creates a sink that sleeps for `summary_delay` before recording each
    /// round summary.
    #[must_use]
    pub fn new(summary_delay: Duration) -> Self {
        Self {
            recorder: RecordingPresentationSink::new(),
            summary_delay,
        }
    }

    /// The publications recorded so far.
    #[must_use]
    pub fn recorder(&self) -> &RecordingPresentationSink {
        &self.recorder
    }
}

#[async_trait]
impl PresentationSink for SlowSummarySink {
    async fn publish_question(
        &self,
        session: &QuizSession,
        question: &Question,
    ) -> Result<(), DomainError> {
        self.recorder.publish_question(session, question).await
    }

    async fn publish_round_summary(
        &self,
        session: &QuizSession,
        question: &Question,
        round_number: usize,
    ) -> Result<(), DomainError> {
        tokio::time::sleep(self.summary_delay).await;
        self.recorder
            .publish_round_summary(session, question, round_number)
            .await
    }

    async fn publish_leaderboard(
        &self,
        session: &QuizSession,
        leaderboard: &Leaderboard,
    ) -> Result<(), DomainError> {
        self.recorder.publish_leaderboard(session, leaderboard).await
    }
}

/// A presentation sink whose every call fails. Sessions must carry on
/// regardless.
#[derive(Debug)]
pub struct FailingPresentationSink;

#[async_trait]
impl PresentationSink for FailingPresentationSink {
    async fn publish_question(
        &self,
        _session: &QuizSession,
        _question: &Question,
    ) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("chat platform unavailable".into()))
    }

    async fn publish_round_summary(
        &self,
        _session: &QuizSession,
        _question: &Question,
        _round_number: usize,
    ) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("chat platform unavailable".into()))
    }

    async fn publish_leaderboard(
        &self,
        _session: &QuizSession,
        _leaderboard: &Leaderboard,
    ) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("chat platform unavailable".into()))
    }
}
