//! Session Driver: feeds the bank to the round resolver, in order.

use quizrun_core::error::DomainError;
use tracing::{debug, info, instrument};

use super::inbox::SignalInbox;
use super::journal::SessionJournal;
use super::round_resolver::RoundResolver;
use crate::domain::leaderboard::Leaderboard;
use crate::domain::round::RoundOutcome;

/// How a driver run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverExit {
    /// The bank was exhausted and the leaderboard published.
    Completed(Leaderboard),
    /// A cancel signal ended the session.
    Cancelled,
}

/// Runs one session from its current position to the end of its bank.
#[derive(Debug)]
pub struct SessionDriver {
    journal: SessionJournal,
    inbox: SignalInbox,
    resolver: RoundResolver,
}

impl SessionDriver {
    /// Creates a driver over a session that is already running.
    #[must_use]
    pub fn new(journal: SessionJournal, inbox: SignalInbox, resolver: RoundResolver) -> Self {
        Self {
            journal,
            inbox,
            resolver,
        }
    }

    /// Plays every remaining question, then publishes the leaderboard.
    ///
    /// Bank entries with a blank prompt are passed over. A round already in
    /// play (after a restart) is resumed first.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NoActiveSession` if the session is not running,
    /// or any error that made the session unable to continue. The session is
    /// abandoned in that case; the caller decides whether to retry.
    #[instrument(
        skip(self),
        fields(
            stream_id = %self.journal.session().id,
            run = self.journal.session().run,
        )
    )]
    pub async fn run(mut self) -> Result<DriverExit, DomainError> {
        if !self.journal.session().is_running() {
            return Err(DomainError::NoActiveSession(format!(
                "session stream {} has no run in progress",
                self.journal.session().id
            )));
        }

        loop {
            let session = self.journal.session();
            let index = match session.round.as_ref() {
                Some(round) => round.question_index,
                None => match session.next_playable_index() {
                    Some(index) => index,
                    None => break,
                },
            };
            if index > session.cursor {
                debug!(
                    from = session.cursor,
                    to = index,
                    "passing over questions with blank prompts"
                );
            }

            let outcome = self
                .resolver
                .run_round(&mut self.journal, &mut self.inbox, index)
                .await?;
            if outcome == RoundOutcome::Cancel {
                info!(question_index = index, "session cancelled");
                return Ok(DriverExit::Cancelled);
            }
        }

        let leaderboard = Leaderboard::rank(&self.journal.session().scores);
        self.resolver
            .publish_leaderboard(self.journal.session(), &leaderboard)
            .await;
        self.journal
            .record(|session, clock| session.complete(clock))
            .await?;
        info!(participants = leaderboard.standings().len(), "session completed");
        Ok(DriverExit::Completed(leaderboard))
    }
}
