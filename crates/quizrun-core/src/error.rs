//! Domain error types.

use thiserror::Error;
use uuid::Uuid;

/// Top-level domain error type.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An aggregate was not found.
    #[error("aggregate not found: {0}")]
    AggregateNotFound(Uuid),

    /// Optimistic concurrency conflict.
    #[error("concurrency conflict on aggregate {aggregate_id}: expected version {expected}, found {actual}")]
    ConcurrencyConflict {
        /// The aggregate that had the conflict.
        aggregate_id: Uuid,
        /// The expected version.
        expected: i64,
        /// The actual version found.
        actual: i64,
    },

    /// A validation error in domain logic.
    #[error("validation error: {0}")]
    Validation(String),

    /// No session is running for the addressed key.
    #[error("no active session: {0}")]
    NoActiveSession(String),

    /// An inbound event payload was missing required fields.
    #[error("malformed event: {0}")]
    MalformedEvent(String),

    /// A signal could not be delivered to a running session.
    #[error("signal delivery failed: {0}")]
    SignalDelivery(String),

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

impl DomainError {
    /// Returns `true` for errors that are absorbed by the caller rather than
    /// ending the session that produced them.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::MalformedEvent(_) | Self::NoActiveSession(_) | Self::SignalDelivery(_)
        )
    }
}
