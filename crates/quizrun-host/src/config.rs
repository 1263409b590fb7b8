//! Host configuration, read from the environment.

use std::time::Duration;

use quizrun_quiz::application::settings::{QuizSettings, SummaryPolicy};

use crate::error::AppError;

const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_LOG_FILTER: &str = "info";
/// Longest reveal window the host accepts.
const MAX_REVEAL_SECS: u64 = 3600;

/// Everything the host needs to start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostConfig {
    /// `PostgreSQL` connection string. `None` keeps events in memory.
    pub database_url: Option<String>,
    /// Pool size for the `PostgreSQL` store.
    pub database_max_connections: u32,
    /// Settings applied to every session.
    pub settings: QuizSettings,
    /// OTLP/gRPC collector endpoint. `None` disables span export.
    pub otlp_endpoint: Option<String>,
    /// `EnvFilter` directives.
    pub log_filter: String,
}

impl HostConfig {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` naming the first variable with an invalid
    /// value.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through `lookup`, which returns the value of
    /// a variable or `None` when it is unset.
    ///
    /// Empty values count as unset.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` naming the first variable with an invalid
    /// value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let database_max_connections: u32 = match var("DATABASE_MAX_CONNECTIONS") {
            Some(value) => value.trim().parse().map_err(|e| {
                AppError::Config(format!("DATABASE_MAX_CONNECTIONS must be a u32: {e}"))
            })?,
            None => DEFAULT_MAX_CONNECTIONS,
        };
        if database_max_connections == 0 {
            return Err(AppError::Config(
                "DATABASE_MAX_CONNECTIONS must be at least 1".into(),
            ));
        }

        let mut settings = QuizSettings::default();
        if let Some(value) = var("QUIZRUN_REVEAL_SECS") {
            let secs: u64 = value.trim().parse().map_err(|e| {
                AppError::Config(format!("QUIZRUN_REVEAL_SECS must be a whole number: {e}"))
            })?;
            if secs > MAX_REVEAL_SECS {
                return Err(AppError::Config(format!(
                    "QUIZRUN_REVEAL_SECS must be at most {MAX_REVEAL_SECS}, got {secs}"
                )));
            }
            settings.reveal_duration = Duration::from_secs(secs);
        }
        if let Some(value) = var("QUIZRUN_SUMMARY_POLICY") {
            settings.summary_policy = value
                .parse::<SummaryPolicy>()
                .map_err(|e| AppError::Config(format!("QUIZRUN_SUMMARY_POLICY: {e}")))?;
        }

        Ok(Self {
            database_url: var("DATABASE_URL"),
            database_max_connections,
            settings,
            otlp_endpoint: var("OTEL_EXPORTER_OTLP_ENDPOINT"),
            log_filter: var("RUST_LOG").unwrap_or_else(|| DEFAULT_LOG_FILTER.to_owned()),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<HostConfig, AppError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        HostConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults_when_nothing_is_set() {
        let config = config(&[]).unwrap();

        assert_eq!(config.database_url, None);
        assert_eq!(config.database_max_connections, 10);
        assert_eq!(config.settings, QuizSettings::default());
        assert_eq!(config.otlp_endpoint, None);
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn test_reads_every_variable() {
        // Arrange
        let vars = [
            ("DATABASE_URL", "postgres://localhost/quizrun"),
            ("DATABASE_MAX_CONNECTIONS", "4"),
            ("QUIZRUN_REVEAL_SECS", "3"),
            ("QUIZRUN_SUMMARY_POLICY", "round_end_only"),
            ("OTEL_EXPORTER_OTLP_ENDPOINT", "http://localhost:4317"),
            ("RUST_LOG", "quizrun=debug"),
        ];

        // Act
        let config = config(&vars).unwrap();

        // Assert
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/quizrun")
        );
        assert_eq!(config.database_max_connections, 4);
        assert_eq!(config.settings.reveal_duration, Duration::from_secs(3));
        assert_eq!(config.settings.summary_policy, SummaryPolicy::RoundEndOnly);
        assert_eq!(
            config.otlp_endpoint.as_deref(),
            Some("http://localhost:4317")
        );
        assert_eq!(config.log_filter, "quizrun=debug");
    }

    #[test]
    fn test_blank_values_count_as_unset() {
        let config = config(&[("DATABASE_URL", "  "), ("RUST_LOG", "")]).unwrap();

        assert_eq!(config.database_url, None);
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn test_invalid_reveal_names_the_variable() {
        let err = config(&[("QUIZRUN_REVEAL_SECS", "soon")]).unwrap_err();

        assert!(matches!(&err, AppError::Config(msg) if msg.contains("QUIZRUN_REVEAL_SECS")));
    }

    #[test]
    fn test_reveal_longer_than_an_hour_is_rejected() {
        let err = config(&[("QUIZRUN_REVEAL_SECS", "10000000000000")]).unwrap_err();
        let longest = config(&[("QUIZRUN_REVEAL_SECS", "3600")]).unwrap();

        assert!(matches!(&err, AppError::Config(msg) if msg.contains("at most 3600")));
        assert_eq!(longest.settings.reveal_duration, Duration::from_secs(3600));
    }

    #[test]
    fn test_unknown_summary_policy_is_rejected() {
        let err = config(&[("QUIZRUN_SUMMARY_POLICY", "sometimes")]).unwrap_err();

        assert!(matches!(&err, AppError::Config(msg) if msg.contains("QUIZRUN_SUMMARY_POLICY")));
    }

    #[test]
    fn test_zero_connections_is_rejected() {
        let err = config(&[("DATABASE_MAX_CONNECTIONS", "0")]).unwrap_err();

        assert!(matches!(&err, AppError::Config(msg) if msg.contains("DATABASE_MAX_CONNECTIONS")));
    }
}
