//! Session journal.
//!
//! Owns a reconstituted [`QuizSession`] and is the only way to change it:
//! each mutation runs against the aggregate, its events are appended to the
//! event store with optimistic concurrency, and only then are they applied.
//! A process that restarts can therefore rebuild the session exactly as it
//! was after its last persisted step.

use std::sync::Arc;

use quizrun_core::aggregate::AggregateRoot;
use quizrun_core::clock::Clock;
use quizrun_core::error::DomainError;
use quizrun_core::event::{DomainEvent, EventMetadata};
use quizrun_core::repository::{EventRepository, StoredEvent};
use uuid::Uuid;

use crate::domain::aggregates::QuizSession;
use crate::domain::events::{QuizEvent, QuizEventKind};
use crate::domain::session_key::SessionKey;

pub(crate) fn to_stored_event(event: &QuizEvent) -> StoredEvent {
    let meta = event.metadata();
    StoredEvent {
        event_id: meta.event_id,
        aggregate_id: meta.aggregate_id,
        event_type: event.event_type().to_owned(),
        payload: event.to_payload(),
        sequence_number: meta.sequence_number,
        correlation_id: meta.correlation_id,
        causation_id: meta.causation_id,
        occurred_at: meta.occurred_at,
    }
}

/// Reconstitutes a `QuizSession` from stored events.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if event deserialization fails.
pub fn reconstitute(
    stream_id: Uuid,
    existing_events: &[StoredEvent],
) -> Result<QuizSession, DomainError> {
    let mut session = QuizSession::new(stream_id);
    for stored in existing_events {
        let kind: QuizEventKind =
            serde_json::from_value(stored.payload.clone()).map_err(|e| {
                DomainError::Infrastructure(format!("event deserialization failed: {e}"))
            })?;
        let event = QuizEvent {
            metadata: EventMetadata {
                event_id: stored.event_id,
                event_type: stored.event_type.clone(),
                aggregate_id: stored.aggregate_id,
                sequence_number: stored.sequence_number,
                correlation_id: stored.correlation_id,
                causation_id: stored.causation_id,
                occurred_at: stored.occurred_at,
            },
            kind,
        };
        session.apply(&event);
    }
    Ok(session)
}

/// A session aggregate bound to the clock and store it is journaled with.
pub struct SessionJournal {
    session: QuizSession,
    clock: Arc<dyn Clock>,
    repository: Arc<dyn EventRepository>,
}

impl std::fmt::Debug for SessionJournal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionJournal")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl SessionJournal {
    /// Wraps an already reconstituted session.
    #[must_use]
    pub fn new(
        session: QuizSession,
        clock: Arc<dyn Clock>,
        repository: Arc<dyn EventRepository>,
    ) -> Self {
        Self {
            session,
            clock,
            repository,
        }
    }

    /// Loads the session stream for `key`. A key that never had a session
    /// yields an empty, not-started stream.
    ///
    /// # Errors
    ///
    /// Returns `DomainError` if loading or deserializing events fails.
    pub async fn open(
        key: &SessionKey,
        clock: Arc<dyn Clock>,
        repository: Arc<dyn EventRepository>,
    ) -> Result<Self, DomainError> {
        Self::open_stream(key.stream_id(), clock, repository).await
    }

    /// Loads the session stream `stream_id`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError` if loading or deserializing events fails.
    pub async fn open_stream(
        stream_id: Uuid,
        clock: Arc<dyn Clock>,
        repository: Arc<dyn EventRepository>,
    ) -> Result<Self, DomainError> {
        let existing_events = repository.load_events(stream_id).await?;
        let session = reconstitute(stream_id, &existing_events)?;
        Ok(Self::new(session, clock, repository))
    }

    /// Returns the session as of its last persisted event.
    #[must_use]
    pub fn session(&self) -> &QuizSession {
        &self.session
    }

    /// Returns the clock mutations are stamped with.
    #[must_use]
    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Runs `operation` against the session and persists the events it
    /// produced, then applies them.
    ///
    /// When the operation or the append fails the pending events are
    /// discarded and the session is left as it was.
    ///
    /// # Errors
    ///
    /// Returns the operation's error, or the repository's error if the append
    /// fails (including `DomainError::ConcurrencyConflict` when another
    /// writer got there first).
    pub async fn record<T, F>(&mut self, operation: F) -> Result<T, DomainError>
    where
        T: Send,
        F: FnOnce(&mut QuizSession, &dyn Clock) -> Result<T, DomainError> + Send,
    {
        let value = match operation(&mut self.session, self.clock.as_ref()) {
            Ok(value) => value,
            Err(err) => {
                self.session.clear_uncommitted_events();
                return Err(err);
            }
        };

        let stored_events: Vec<StoredEvent> = self
            .session
            .uncommitted_events()
            .iter()
            .map(to_stored_event)
            .collect();
        if !stored_events.is_empty() {
            if let Err(err) = self
                .repository
                .append_events(self.session.id, self.session.version, &stored_events)
                .await
            {
                self.session.clear_uncommitted_events();
                return Err(err);
            }
        }

        self.session.apply_uncommitted();
        Ok(value)
    }
}
