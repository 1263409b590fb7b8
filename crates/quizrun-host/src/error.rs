//! Quizrun host error types.

use quizrun_core::error::DomainError;
use thiserror::Error;

/// Startup and runtime errors for the host process.
#[derive(Debug, Error)]
pub enum AppError {
    /// An environment variable is invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Database connection or pool error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Signal handling or other I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The tracing subscriber or span exporter could not be installed.
    #[error("telemetry error: {0}")]
    Telemetry(String),

    /// Session recovery failed.
    #[error("recovery error: {0}")]
    Recovery(#[from] DomainError),
}
