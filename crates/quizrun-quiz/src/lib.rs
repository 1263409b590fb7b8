//! Quizrun — Quiz Session bounded context.
//!
//! Runs timed, multi-round quiz sessions for one (guild, channel) pair at a
//! time: presents each question, races the answer deadline against skip,
//! cancel and answer signals, tallies scores and publishes a leaderboard
//! once the bank is exhausted.
//!
//! All session state lives in the event-sourced [`domain::aggregates::QuizSession`]
//! and is only mutated through [`application::journal::SessionJournal`], so a
//! session can be reconstituted and resumed after the owning process restarts.

pub mod application;
pub mod domain;
