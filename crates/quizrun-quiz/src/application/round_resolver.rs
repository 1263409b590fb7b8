//! Round Resolver: drives one question from presentation to its outcome.
//!
//! A round races its answer deadline against the session's signal inbox.
//! Each loop iteration consumes exactly one event; the deadline timer is
//! created once per round and keeps running across answer iterations.
//! When the deadline fires, signals that were already queued are still
//! applied to the round before it ends.
//!
//! Rounds are resumable. The resolver picks up from the phase recorded in
//! the journal, so a round that was already presented is not presented
//! again and a round that was already revealing only waits out the rest of
//! its reveal window.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use quizrun_core::clock::Clock;
use quizrun_core::error::DomainError;
use tracing::{debug, info, warn};

use super::inbox::SignalInbox;
use super::journal::SessionJournal;
use super::ports::PresentationSink;
use super::settings::{QuizSettings, SummaryPolicy};
use crate::domain::aggregates::QuizSession;
use crate::domain::leaderboard::Leaderboard;
use crate::domain::question::Question;
use crate::domain::round::{RoundOutcome, RoundState};
use crate::domain::signal::{AnswerSubmission, Signal};

enum RoundEvent {
    Deadline,
    Signal(Signal),
}

/// Time left until `instant`, or zero when it has passed.
fn remaining(clock: &dyn Clock, instant: DateTime<Utc>) -> Duration {
    (instant - clock.now()).to_std().unwrap_or(Duration::ZERO)
}

fn round_state(journal: &SessionJournal) -> Option<RoundState> {
    journal.session().round.as_ref().map(|round| round.state)
}

/// Runs rounds against a presentation sink.
#[derive(Clone)]
pub struct RoundResolver {
    presentation: Arc<dyn PresentationSink>,
    settings: QuizSettings,
}

impl std::fmt::Debug for RoundResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoundResolver")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl RoundResolver {
    /// Creates a resolver.
    #[must_use]
    pub fn new(presentation: Arc<dyn PresentationSink>, settings: QuizSettings) -> Self {
        Self {
            presentation,
            settings,
        }
    }

    /// Runs the round for the question at `index` to completion.
    ///
    /// Opens the round unless the session already has it in play, in which
    /// case it resumes from the recorded phase.
    ///
    /// # Errors
    ///
    /// Returns `DomainError` when the journal cannot record a step, or when a
    /// different round is already in play. Malformed answers are not errors.
    pub async fn run_round(
        &self,
        journal: &mut SessionJournal,
        inbox: &mut SignalInbox,
        index: usize,
    ) -> Result<RoundOutcome, DomainError> {
        match journal.session().round.as_ref() {
            Some(round) if round.question_index != index => {
                return Err(DomainError::Validation(format!(
                    "cannot run question {index} while question {} is {}",
                    round.question_index, round.state
                )));
            }
            Some(round) => {
                debug!(question_index = index, state = %round.state, "resuming round");
            }
            None => {
                journal
                    .record(|session, clock| session.begin_round(index, clock))
                    .await?;
            }
        }

        let question = journal
            .session()
            .question(index)
            .cloned()
            .ok_or_else(|| {
                DomainError::Validation(format!("question index {index} is outside the bank"))
            })?;
        let round_number = index + 1;

        if round_state(journal) == Some(RoundState::Presenting) {
            self.publish_question(journal.session(), &question).await;
            journal
                .record(|session, clock| session.mark_presented(clock))
                .await?;
        }

        if round_state(journal) == Some(RoundState::AwaitingSignal) {
            let outcome = self
                .await_signals(journal, inbox, &question, round_number)
                .await?;
            if outcome != RoundOutcome::Continue {
                return Ok(outcome);
            }
        }

        self.await_reveal(journal, inbox, index).await
    }

    async fn await_signals(
        &self,
        journal: &mut SessionJournal,
        inbox: &mut SignalInbox,
        question: &Question,
        round_number: usize,
    ) -> Result<RoundOutcome, DomainError> {
        let deadline = journal
            .session()
            .round
            .as_ref()
            .map_or_else(|| journal.clock().now(), |round| round.deadline);
        let timer = tokio::time::sleep(remaining(journal.clock(), deadline));
        tokio::pin!(timer);

        loop {
            let event = tokio::select! {
                biased;
                () = &mut timer => RoundEvent::Deadline,
                signal = inbox.next() => RoundEvent::Signal(signal),
            };

            let signal = match event {
                RoundEvent::Deadline => break,
                RoundEvent::Signal(signal) => signal,
            };
            if let Some(outcome) = self
                .apply_signal(journal, question, round_number, signal)
                .await?
            {
                return Ok(outcome);
            }
        }

        // Signals queued while the resolver was busy arrived before the
        // deadline was observed and still belong to this round.
        let queued = inbox.buffer_queued();
        if queued > 0 {
            debug!(round_number, queued, "handling signals queued at the deadline");
        }
        for _ in 0..queued {
            let Some(signal) = inbox.try_next() else {
                break;
            };
            if let Some(outcome) = self
                .apply_signal(journal, question, round_number, signal)
                .await?
            {
                return Ok(outcome);
            }
        }

        debug!(round_number, "answer deadline reached");
        self.publish_round_summary(journal.session(), question, round_number)
            .await;
        let reveal = self.settings.reveal_duration;
        journal
            .record(|session, clock| session.end_round(RoundOutcome::Continue, reveal, clock))
            .await?;
        Ok(RoundOutcome::Continue)
    }

    /// Applies one signal to the open round. Returns the outcome when the
    /// signal ends the round.
    async fn apply_signal(
        &self,
        journal: &mut SessionJournal,
        question: &Question,
        round_number: usize,
        signal: Signal,
    ) -> Result<Option<RoundOutcome>, DomainError> {
        match signal {
            Signal::Cancel => {
                info!(round_number, "cancel received; ending session");
                journal.record(|session, clock| session.cancel(clock)).await?;
                Ok(Some(RoundOutcome::Cancel))
            }
            Signal::Skip => {
                info!(round_number, "skip received; moving on");
                journal
                    .record(|session, clock| {
                        session.end_round(RoundOutcome::Skip, Duration::ZERO, clock)
                    })
                    .await?;
                Ok(Some(RoundOutcome::Skip))
            }
            Signal::Answer(payload) => {
                let submission = match AnswerSubmission::from_payload(&payload) {
                    Ok(submission) => submission,
                    Err(err) => {
                        debug!(round_number, error = %err, "ignoring malformed answer");
                        return Ok(None);
                    }
                };
                let awarded = journal
                    .record(|session, clock| session.record_answer(&submission, clock))
                    .await?;
                debug!(
                    round_number,
                    user_id = %submission.user_id,
                    answer_id = %submission.answer_id,
                    awarded,
                    "answer recorded"
                );
                if self.settings.summary_policy == SummaryPolicy::EveryAnswer {
                    self.publish_round_summary(journal.session(), question, round_number)
                        .await;
                }
                Ok(None)
            }
        }
    }

    async fn await_reveal(
        &self,
        journal: &mut SessionJournal,
        inbox: &mut SignalInbox,
        index: usize,
    ) -> Result<RoundOutcome, DomainError> {
        let reveal_until = journal
            .session()
            .round
            .as_ref()
            .and_then(|round| round.reveal_until)
            .unwrap_or_else(|| journal.clock().now());
        let timer = tokio::time::sleep(remaining(journal.clock(), reveal_until));
        tokio::pin!(timer);

        loop {
            let event = tokio::select! {
                biased;
                () = &mut timer => RoundEvent::Deadline,
                signal = inbox.next() => RoundEvent::Signal(signal),
            };

            match event {
                RoundEvent::Deadline => {
                    journal
                        .record(|session, clock| session.complete_reveal(clock))
                        .await?;
                    return Ok(RoundOutcome::Continue);
                }
                RoundEvent::Signal(Signal::Cancel) => {
                    info!(question_index = index, "cancel received during reveal");
                    journal.record(|session, clock| session.cancel(clock)).await?;
                    return Ok(RoundOutcome::Cancel);
                }
                RoundEvent::Signal(other) => {
                    debug!(
                        question_index = index,
                        signal = other.name(),
                        "ignoring signal during reveal"
                    );
                }
            }
        }
    }

    async fn publish_question(&self, session: &QuizSession, question: &Question) {
        if let Err(err) = self.presentation.publish_question(session, question).await {
            warn!(question_id = %question.id, error = %err, "failed to publish question");
        }
    }

    async fn publish_round_summary(
        &self,
        session: &QuizSession,
        question: &Question,
        round_number: usize,
    ) {
        if let Err(err) = self
            .presentation
            .publish_round_summary(session, question, round_number)
            .await
        {
            warn!(question_id = %question.id, error = %err, "failed to publish round summary");
        }
    }

    /// Publishes the final standings, logging rather than returning a
    /// failure.
    pub async fn publish_leaderboard(&self, session: &QuizSession, leaderboard: &Leaderboard) {
        if let Err(err) = self
            .presentation
            .publish_leaderboard(session, leaderboard)
            .await
        {
            warn!(error = %err, "failed to publish leaderboard");
        }
    }
}
