//! Quizrun host: configuration, telemetry and startup errors for the
//! `quizrun-host` binary.

pub mod config;
pub mod error;
pub mod telemetry;
