//! Aggregate roots for the quiz context.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use quizrun_core::aggregate::AggregateRoot;
use quizrun_core::clock::Clock;
use quizrun_core::error::DomainError;
use quizrun_core::event::EventMetadata;
use serde::Serialize;
use uuid::Uuid;

use super::events::{
    AnswerRecorded, QuestionPresented, QuizCancelled, QuizCompleted, QuizEvent, QuizEventKind,
    QuizStarted, QuizTerminated, RevealCompleted, RoundEnded, RoundStarted,
};
use super::leaderboard::Leaderboard;
use super::question::Question;
use super::round::{RoundOutcome, RoundState, RoundTrigger};
use super::session_key::SessionKey;
use super::signal::AnswerSubmission;

/// Lifecycle of the run currently held by a session stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// No run has been started on this stream.
    NotStarted,
    /// A driver owns the run.
    Running,
    /// A cancel signal ended the run.
    Cancelled,
    /// The bank was exhausted and the leaderboard published.
    Completed,
    /// The run was ended from outside the driver.
    Terminated,
}

/// The round in play.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveRound {
    /// Position of the question in the bank.
    pub question_index: usize,
    /// Where the round is.
    pub state: RoundState,
    /// When the round opened.
    pub started_at: DateTime<Utc>,
    /// When the answer window closes.
    pub deadline: DateTime<Utc>,
    /// End of the reveal window once the round is revealing.
    pub reveal_until: Option<DateTime<Utc>>,
}

/// The aggregate root for a quiz session, one stream per (guild, channel).
///
/// Every mutation is expressed as an event; methods validate against the
/// applied state and push uncommitted events, which the session journal
/// persists and then applies.
#[derive(Debug)]
pub struct QuizSession {
    /// Aggregate identifier.
    pub id: Uuid,
    /// Current version (event count).
    pub version: i64,
    /// The key this stream belongs to, known once a run has started.
    pub key: Option<SessionKey>,
    /// Run counter; each `QuizStarted` increments it.
    pub run: u32,
    /// Correlation id of the command that started the current run.
    pub correlation_id: Uuid,
    /// Lifecycle of the current run.
    pub status: SessionStatus,
    /// The bank for the current run.
    pub questions: Vec<Question>,
    /// First bank position not yet played.
    pub cursor: usize,
    /// The round in play, if any.
    pub round: Option<ActiveRound>,
    /// Cumulative points per participant.
    pub scores: BTreeMap<String, u32>,
    /// Participants who answered correctly in the current round.
    pub round_correct: BTreeSet<String>,
    /// Participants who answered in the current round.
    pub round_answered: BTreeSet<String>,
    /// Final standings once the run completed.
    pub leaderboard: Option<Leaderboard>,
    /// Uncommitted events pending persistence.
    uncommitted_events: Vec<QuizEvent>,
}

impl QuizSession {
    /// Creates an empty session stream.
    #[must_use]
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            version: 0,
            key: None,
            run: 0,
            correlation_id: Uuid::nil(),
            status: SessionStatus::NotStarted,
            questions: Vec::new(),
            cursor: 0,
            round: None,
            scores: BTreeMap::new(),
            round_correct: BTreeSet::new(),
            round_answered: BTreeSet::new(),
            leaderboard: None,
            uncommitted_events: Vec::new(),
        }
    }

    /// Creates an empty session stream for `key`.
    #[must_use]
    pub fn for_key(key: &SessionKey) -> Self {
        Self::new(key.stream_id())
    }

    /// Returns `true` while a driver owns the run.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.status == SessionStatus::Running
    }

    /// Returns the question at `index`.
    #[must_use]
    pub fn question(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    /// Returns the question of the round in play.
    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.round
            .as_ref()
            .and_then(|round| self.question(round.question_index))
    }

    /// Returns the first bank position at or after the cursor whose question
    /// has a prompt. Blank entries are passed over.
    #[must_use]
    pub fn next_playable_index(&self) -> Option<usize> {
        (self.cursor..self.questions.len()).find(|&i| self.questions[i].has_prompt())
    }

    #[allow(clippy::cast_possible_wrap)]
    fn next_sequence_number(&self) -> i64 {
        self.version + self.uncommitted_events.len() as i64 + 1
    }

    fn emit(&mut self, kind: QuizEventKind, correlation_id: Uuid, clock: &dyn Clock) {
        let sequence_number = self.next_sequence_number();
        let event = QuizEvent {
            metadata: EventMetadata {
                event_id: EventMetadata::deterministic_event_id(self.id, sequence_number),
                event_type: kind.event_type().to_owned(),
                aggregate_id: self.id,
                sequence_number,
                correlation_id,
                causation_id: correlation_id,
                occurred_at: clock.now(),
            },
            kind,
        };
        self.uncommitted_events.push(event);
    }

    fn ensure_running(&self) -> Result<(), DomainError> {
        if self.is_running() {
            Ok(())
        } else {
            Err(DomainError::NoActiveSession(format!(
                "session stream {} is {:?}",
                self.id, self.status
            )))
        }
    }

    fn active_round(&self) -> Result<&ActiveRound, DomainError> {
        self.ensure_running()?;
        self.round.as_ref().ok_or_else(|| {
            DomainError::Validation(format!("session stream {} has no round in play", self.id))
        })
    }

    /// Starts a new run with `questions`, producing a `QuizStarted` event.
    ///
    /// The bank is taken as given; callers validate it first.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if a run is already in progress.
    pub fn start_quiz(
        &mut self,
        key: &SessionKey,
        questions: Vec<Question>,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        if self.is_running() {
            return Err(DomainError::Validation(format!(
                "a quiz is already running for {key}"
            )));
        }
        let run = self.run + 1;
        self.emit(
            QuizEventKind::QuizStarted(QuizStarted {
                guild_id: key.guild_id.clone(),
                channel_id: key.channel_id.clone(),
                questions,
                run,
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Opens the round for the question at `index`, producing a
    /// `RoundStarted` event whose deadline is read from `clock` once.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NoActiveSession` if the run is over, or
    /// `DomainError::Validation` if a round is already in play or `index` is
    /// outside the bank.
    pub fn begin_round(&mut self, index: usize, clock: &dyn Clock) -> Result<(), DomainError> {
        self.ensure_running()?;
        if let Some(round) = &self.round {
            return Err(DomainError::Validation(format!(
                "round for question {} is still {}",
                round.question_index, round.state
            )));
        }
        let question = self.question(index).ok_or_else(|| {
            DomainError::Validation(format!(
                "question index {index} is outside a bank of {}",
                self.questions.len()
            ))
        })?;
        let started_at = clock.now();
        let deadline = started_at + question.time_budget();
        self.emit(
            QuizEventKind::RoundStarted(RoundStarted {
                question_index: index,
                started_at,
                deadline,
            }),
            self.correlation_id,
            clock,
        );
        Ok(())
    }

    /// Marks the question of the round as presented, producing a
    /// `QuestionPresented` event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError` if no round is in play or it has already been
    /// presented.
    pub fn mark_presented(&mut self, clock: &dyn Clock) -> Result<(), DomainError> {
        let round = self.active_round()?;
        round.state.next(RoundTrigger::Presented)?;
        let question_index = round.question_index;
        self.emit(
            QuizEventKind::QuestionPresented(QuestionPresented { question_index }),
            self.correlation_id,
            clock,
        );
        Ok(())
    }

    /// Records a well-formed answer, producing an `AnswerRecorded` event.
    ///
    /// Returns whether the answer earned a point: it must be correct and the
    /// participant must not already have scored in this round.
    ///
    /// # Errors
    ///
    /// Returns `DomainError` if no round is accepting answers.
    pub fn record_answer(
        &mut self,
        submission: &AnswerSubmission,
        clock: &dyn Clock,
    ) -> Result<bool, DomainError> {
        let round = self.active_round()?;
        round.state.next(RoundTrigger::Answer)?;
        let question_index = round.question_index;
        let correct = self
            .question(question_index)
            .is_some_and(|q| q.is_correct(&submission.answer_id));
        let awarded = correct && !self.round_correct.contains(&submission.user_id);
        self.emit(
            QuizEventKind::AnswerRecorded(AnswerRecorded {
                question_index,
                user_id: submission.user_id.clone(),
                answer_id: submission.answer_id.clone(),
                correct,
                awarded,
            }),
            self.correlation_id,
            clock,
        );
        Ok(awarded)
    }

    /// Closes the round, producing a `RoundEnded` event.
    ///
    /// A `Continue` round opens a reveal window of `reveal` from now; a
    /// `Skip` round moves straight to the next question.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for a `Cancel` outcome (use
    /// [`QuizSession::cancel`]), when no round is awaiting signals, or when
    /// `reveal` is too large to represent.
    pub fn end_round(
        &mut self,
        outcome: RoundOutcome,
        reveal: Duration,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        let round = self.active_round()?;
        let trigger = match outcome {
            RoundOutcome::Continue => RoundTrigger::Deadline,
            RoundOutcome::Skip => RoundTrigger::Skip,
            RoundOutcome::Cancel => {
                return Err(DomainError::Validation(
                    "a cancelled round ends the session; use cancel".to_owned(),
                ));
            }
        };
        round.state.next(trigger)?;
        let question_index = round.question_index;
        let reveal_until = match outcome {
            RoundOutcome::Continue => {
                let window = TimeDelta::from_std(reveal).map_err(|e| {
                    DomainError::Validation(format!("reveal duration out of range: {e}"))
                })?;
                let until = clock.now().checked_add_signed(window).ok_or_else(|| {
                    DomainError::Validation(format!(
                        "reveal of {}s runs past the last representable instant",
                        reveal.as_secs()
                    ))
                })?;
                Some(until)
            }
            _ => None,
        };
        self.emit(
            QuizEventKind::RoundEnded(RoundEnded {
                question_index,
                outcome,
                reveal_until,
            }),
            self.correlation_id,
            clock,
        );
        Ok(())
    }

    /// Closes the reveal window, producing a `RevealCompleted` event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError` if no round is revealing.
    pub fn complete_reveal(&mut self, clock: &dyn Clock) -> Result<(), DomainError> {
        let round = self.active_round()?;
        round.state.next(RoundTrigger::RevealElapsed)?;
        let question_index = round.question_index;
        self.emit(
            QuizEventKind::RevealCompleted(RevealCompleted { question_index }),
            self.correlation_id,
            clock,
        );
        Ok(())
    }

    /// Ends the run on a cancel signal, producing a `QuizCancelled` event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NoActiveSession` if the run is already over.
    pub fn cancel(&mut self, clock: &dyn Clock) -> Result<(), DomainError> {
        self.ensure_running()?;
        let question_index = match &self.round {
            Some(round) => {
                round.state.next(RoundTrigger::Cancel)?;
                Some(round.question_index)
            }
            None => None,
        };
        self.emit(
            QuizEventKind::QuizCancelled(QuizCancelled { question_index }),
            self.correlation_id,
            clock,
        );
        Ok(())
    }

    /// Finishes the run once the bank is exhausted, producing a
    /// `QuizCompleted` event carrying the ranked leaderboard.
    ///
    /// # Errors
    ///
    /// Returns `DomainError` if the run is over or a round is still in play.
    pub fn complete(&mut self, clock: &dyn Clock) -> Result<Leaderboard, DomainError> {
        self.ensure_running()?;
        if let Some(round) = &self.round {
            return Err(DomainError::Validation(format!(
                "round for question {} is still {}",
                round.question_index, round.state
            )));
        }
        let leaderboard = Leaderboard::rank(&self.scores);
        self.emit(
            QuizEventKind::QuizCompleted(QuizCompleted {
                leaderboard: leaderboard.clone(),
            }),
            self.correlation_id,
            clock,
        );
        Ok(leaderboard)
    }

    /// Ends the run from outside the driver, producing a `QuizTerminated`
    /// event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NoActiveSession` if the run is already over.
    pub fn terminate(&mut self, reason: &str, clock: &dyn Clock) -> Result<(), DomainError> {
        self.ensure_running()?;
        self.emit(
            QuizEventKind::QuizTerminated(QuizTerminated {
                reason: reason.to_owned(),
            }),
            self.correlation_id,
            clock,
        );
        Ok(())
    }

    fn clear_round_sets(&mut self) {
        self.round_correct.clear();
        self.round_answered.clear();
    }
}

impl AggregateRoot for QuizSession {
    type Event = QuizEvent;

    fn aggregate_id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn apply(&mut self, event: &Self::Event) {
        match &event.kind {
            QuizEventKind::QuizStarted(started) => {
                self.key = Some(SessionKey::new(&started.guild_id, &started.channel_id));
                self.run = started.run;
                self.correlation_id = event.metadata.correlation_id;
                self.status = SessionStatus::Running;
                self.questions.clone_from(&started.questions);
                self.cursor = 0;
                self.round = None;
                self.scores.clear();
                self.clear_round_sets();
                self.leaderboard = None;
            }
            QuizEventKind::RoundStarted(started) => {
                self.cursor = started.question_index;
                self.round = Some(ActiveRound {
                    question_index: started.question_index,
                    state: RoundState::Presenting,
                    started_at: started.started_at,
                    deadline: started.deadline,
                    reveal_until: None,
                });
                self.clear_round_sets();
            }
            QuizEventKind::QuestionPresented(_) => {
                if let Some(round) = &mut self.round {
                    round.state = RoundState::AwaitingSignal;
                }
            }
            QuizEventKind::AnswerRecorded(answer) => {
                self.round_answered.insert(answer.user_id.clone());
                let score = self.scores.entry(answer.user_id.clone()).or_insert(0);
                if answer.awarded {
                    *score += 1;
                    self.round_correct.insert(answer.user_id.clone());
                }
            }
            QuizEventKind::RoundEnded(ended) => {
                self.clear_round_sets();
                match ended.outcome {
                    RoundOutcome::Continue => {
                        if let Some(round) = &mut self.round {
                            round.state = RoundState::Revealing;
                            round.reveal_until = ended.reveal_until;
                        }
                    }
                    RoundOutcome::Skip | RoundOutcome::Cancel => {
                        self.round = None;
                        self.cursor = ended.question_index + 1;
                    }
                }
            }
            QuizEventKind::RevealCompleted(revealed) => {
                self.round = None;
                self.cursor = revealed.question_index + 1;
            }
            QuizEventKind::QuizCancelled(_) => {
                self.status = SessionStatus::Cancelled;
                self.round = None;
            }
            QuizEventKind::QuizCompleted(completed) => {
                self.status = SessionStatus::Completed;
                self.leaderboard = Some(completed.leaderboard.clone());
            }
            QuizEventKind::QuizTerminated(_) => {
                self.status = SessionStatus::Terminated;
                self.round = None;
            }
        }
        self.version += 1;
    }

    fn uncommitted_events(&self) -> &[Self::Event] {
        &self.uncommitted_events
    }

    fn clear_uncommitted_events(&mut self) {
        self.uncommitted_events.clear();
    }
}
