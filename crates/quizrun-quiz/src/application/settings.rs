//! Session tuning.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use quizrun_core::error::DomainError;
use serde::{Deserialize, Serialize};

/// Default post-round reveal wait.
pub const DEFAULT_REVEAL_DURATION: Duration = Duration::from_secs(5);

/// When the round resolver publishes a round summary.
///
/// A summary is always published when the answer deadline fires.
/// `EveryAnswer` also publishes one after each recorded answer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryPolicy {
    /// Publish after every answer and at the deadline.
    #[default]
    EveryAnswer,
    /// Publish only at the deadline.
    RoundEndOnly,
}

impl FromStr for SummaryPolicy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "every_answer" => Ok(Self::EveryAnswer),
            "round_end_only" => Ok(Self::RoundEndOnly),
            other => Err(DomainError::Validation(format!(
                "unknown summary policy {other:?}; expected every_answer or round_end_only"
            ))),
        }
    }
}

impl fmt::Display for SummaryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::EveryAnswer => "every_answer",
            Self::RoundEndOnly => "round_end_only",
        })
    }
}

/// Settings shared by every session a runtime drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuizSettings {
    /// How long the correct answer stays revealed before the next question.
    pub reveal_duration: Duration,
    /// When round summaries are published.
    pub summary_policy: SummaryPolicy,
}

impl Default for QuizSettings {
    fn default() -> Self {
        Self {
            reveal_duration: DEFAULT_REVEAL_DURATION,
            summary_policy: SummaryPolicy::default(),
        }
    }
}
