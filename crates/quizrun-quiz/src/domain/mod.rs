//! Domain model for the Quiz Session context.

pub mod aggregates;
pub mod commands;
pub mod events;
pub mod leaderboard;
pub mod question;
pub mod round;
pub mod session_key;
pub mod signal;
