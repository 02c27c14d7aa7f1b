//! Worker configuration loaded from environment variables.

use chrono::Duration;

/// Worker configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `DATABASE_URL` — PostgreSQL connection string; in-memory stores are
///   used when unset (development mode)
/// - `POLL_INTERVAL_SECS` — seconds between worker passes (default: `5`)
/// - `TASK_RETRY_AFTER_MINUTES` — lease age before the retry sweep
///   reclaims a running task (default: `10`)
/// - `TASK_ABORT_AFTER_MINUTES` — lease age before an exhausted task is
///   aborted (default: `60`)
/// - `REEXPORT_AFTER_MINUTES` — export-claim age before a crashed
///   exporter's transaction is reclaimed (default: `10`)
/// - `OPERATOR_EMAIL` — recipient of abort alerts
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
///
/// The sweep windows are deployment configuration, not core invariants;
/// the stores take whatever interval the caller supplies.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: Option<String>,
    pub poll_interval_secs: u64,
    pub task_retry_after_minutes: i64,
    pub task_abort_after_minutes: i64,
    pub reexport_after_minutes: i64,
    pub operator_email: String,
    pub log_level: String,
}

impl Config {
    /// Loads configuration from environment variables, falling back to
    /// defaults.
    pub fn from_env() -> Self {
        Self {
            database_url: std::env::var("DATABASE_URL").ok(),
            poll_interval_secs: env_parsed("POLL_INTERVAL_SECS", 5),
            task_retry_after_minutes: env_parsed("TASK_RETRY_AFTER_MINUTES", 10),
            task_abort_after_minutes: env_parsed("TASK_ABORT_AFTER_MINUTES", 60),
            reexport_after_minutes: env_parsed("REEXPORT_AFTER_MINUTES", 10),
            operator_email: std::env::var("OPERATOR_EMAIL")
                .unwrap_or_else(|_| "ops@boxoffice.example".to_string()),
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        }
    }

    /// Lease age before the retry sweep reclaims a running task.
    pub fn task_retry_after(&self) -> Duration {
        Duration::minutes(self.task_retry_after_minutes)
    }

    /// Lease age before an exhausted task is aborted.
    pub fn task_abort_after(&self) -> Duration {
        Duration::minutes(self.task_abort_after_minutes)
    }

    /// Export-claim age before a transaction goes back to unexported.
    pub fn reexport_after(&self) -> Duration {
        Duration::minutes(self.reexport_after_minutes)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            poll_interval_secs: 5,
            task_retry_after_minutes: 10,
            task_abort_after_minutes: 60,
            reexport_after_minutes: 10,
            operator_email: "ops@boxoffice.example".to_string(),
            log_level: "info".to_string(),
        }
    }
}

fn env_parsed<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert!(config.database_url.is_none());
        assert_eq!(config.poll_interval_secs, 5);
        assert_eq!(config.task_retry_after_minutes, 10);
        assert_eq!(config.task_abort_after_minutes, 60);
        assert_eq!(config.reexport_after_minutes, 10);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_sweep_durations() {
        let config = Config::default();
        assert_eq!(config.task_retry_after(), Duration::minutes(10));
        assert_eq!(config.task_abort_after(), Duration::minutes(60));
        assert_eq!(config.reexport_after(), Duration::minutes(10));
    }
}
