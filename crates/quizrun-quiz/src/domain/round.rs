//! Round state machine.
//!
//! ```text
//! Presenting ──presented──▶ AwaitingSignal ──deadline──▶ Revealing ──elapsed──▶ RoundEnded
//!     │                       │    ▲   │                     │
//!     │                       └────┘   └──skip──▶ RoundEnded │
//!     │                       answer                         │
//!     └──────────cancel (from any waiting state)─────────────┴──▶ SessionCancelled
//! ```

use std::fmt;

use quizrun_core::error::DomainError;
use serde::{Deserialize, Serialize};

/// How a round finished, as seen by the session driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundOutcome {
    /// The deadline passed; the round was summarised and revealed.
    Continue,
    /// A skip signal ended the round; no reveal wait.
    Skip,
    /// A cancel signal ended the whole session.
    Cancel,
}

/// Where a round currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundState {
    /// The question is being published.
    Presenting,
    /// Waiting for the deadline, a skip, a cancel or an answer.
    AwaitingSignal,
    /// Post-round reveal window; only cancel is acted upon.
    Revealing,
    /// The round is over.
    RoundEnded,
    /// The session was cancelled during this round.
    SessionCancelled,
}

/// What moves a round from one state to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundTrigger {
    /// The question reached the presentation sink.
    Presented,
    /// An answer was accepted.
    Answer,
    /// The answer deadline fired.
    Deadline,
    /// A skip signal arrived.
    Skip,
    /// A cancel signal arrived.
    Cancel,
    /// The reveal window elapsed.
    RevealElapsed,
}

impl RoundState {
    /// Returns the state `trigger` leads to.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` when `trigger` is not accepted in
    /// this state.
    pub fn next(self, trigger: RoundTrigger) -> Result<Self, DomainError> {
        use RoundState::{AwaitingSignal, Presenting, Revealing, RoundEnded, SessionCancelled};
        use RoundTrigger as T;

        match (self, trigger) {
            (Presenting, T::Presented) | (AwaitingSignal, T::Answer) => Ok(AwaitingSignal),
            (AwaitingSignal, T::Deadline) => Ok(Revealing),
            (AwaitingSignal, T::Skip) | (Revealing, T::RevealElapsed) => Ok(RoundEnded),
            (Presenting | AwaitingSignal | Revealing, T::Cancel) => Ok(SessionCancelled),
            (state, trigger) => Err(DomainError::Validation(format!(
                "round in state {state} does not accept {trigger:?}"
            ))),
        }
    }

    /// Returns `true` once the round can no longer change.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::RoundEnded | Self::SessionCancelled)
    }
}

impl fmt::Display for RoundState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Presenting => "presenting",
            Self::AwaitingSignal => "awaiting_signal",
            Self::Revealing => "revealing",
            Self::RoundEnded => "round_ended",
            Self::SessionCancelled => "session_cancelled",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_reaches_round_ended() {
        let state = RoundState::Presenting
            .next(RoundTrigger::Presented)
            .and_then(|s| s.next(RoundTrigger::Answer))
            .and_then(|s| s.next(RoundTrigger::Answer))
            .and_then(|s| s.next(RoundTrigger::Deadline))
            .and_then(|s| s.next(RoundTrigger::RevealElapsed))
            .unwrap();

        assert_eq!(state, RoundState::RoundEnded);
        assert!(state.is_terminal());
    }

    #[test]
    fn test_skip_ends_round_without_reveal() {
        let state = RoundState::AwaitingSignal.next(RoundTrigger::Skip).unwrap();

        assert_eq!(state, RoundState::RoundEnded);
    }

    #[test]
    fn test_cancel_is_accepted_from_every_waiting_state() {
        for state in [
            RoundState::Presenting,
            RoundState::AwaitingSignal,
            RoundState::Revealing,
        ] {
            assert_eq!(
                state.next(RoundTrigger::Cancel).unwrap(),
                RoundState::SessionCancelled
            );
        }
    }

    #[test]
    fn test_answers_are_rejected_while_revealing() {
        let err = RoundState::Revealing.next(RoundTrigger::Answer).unwrap_err();

        assert!(matches!(err, DomainError::Validation(msg) if msg.contains("revealing")));
    }

    #[test]
    fn test_terminal_states_accept_nothing() {
        assert!(RoundState::RoundEnded.next(RoundTrigger::Cancel).is_err());
        assert!(RoundState::SessionCancelled.next(RoundTrigger::Deadline).is_err());
    }
}
