//! Centralized server configuration.
//!
//! Loaded via the `config` crate from environment variables, with `__`
//! separating nested keys (`SCHEDULER__TIMEZONE`).

use chrono_tz::Tz;
use duebell_core::Result;
use duebell_scheduler::{RunnerConfig, ScheduleError, parse_zone};
use serde::Deserialize;
use std::time::Duration;

/// Server configuration.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// PostgreSQL database connection URL.
    pub database_url: String,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

/// Connection pool settings.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
        }
    }
}

/// Trigger engine settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// IANA zone that meeting dates and times are local to.
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// Pause between runs, in seconds.
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u64,

    /// Wall-clock budget for one run, in seconds.
    #[serde(default = "default_run_budget_seconds")]
    pub run_budget_seconds: u64,

    /// How late a missed trigger may still fire.
    #[serde(default = "default_lookback_hours")]
    pub lookback_hours: i64,

    /// How far ahead meeting candidates are fetched.
    #[serde(default = "default_meeting_lookahead_days")]
    pub meeting_lookahead_days: i64,
}

fn default_timezone() -> String {
    "Asia/Tehran".to_string()
}

fn default_interval_seconds() -> u64 {
    60
}

fn default_run_budget_seconds() -> u64 {
    50
}

fn default_lookback_hours() -> i64 {
    duebell_scheduler::DEFAULT_LOOKBACK_HOURS
}

fn default_meeting_lookahead_days() -> i64 {
    duebell_scheduler::DEFAULT_LOOKAHEAD_DAYS
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            interval_seconds: default_interval_seconds(),
            run_budget_seconds: default_run_budget_seconds(),
            lookback_hours: default_lookback_hours(),
            meeting_lookahead_days: default_meeting_lookahead_days(),
        }
    }
}

impl SchedulerConfig {
    /// Parses the configured zone.
    pub fn zone(&self) -> Result<Tz, ScheduleError> {
        parse_zone(&self.timezone)
    }

    #[must_use]
    pub fn runner(&self) -> RunnerConfig {
        RunnerConfig {
            interval: Duration::from_secs(self.interval_seconds),
            budget: Duration::from_secs(self.run_budget_seconds),
        }
    }

    #[must_use]
    pub fn lookback(&self) -> chrono::Duration {
        chrono::Duration::hours(self.lookback_hours)
    }

    #[must_use]
    pub fn meeting_lookahead(&self) -> chrono::Duration {
        chrono::Duration::days(self.meeting_lookahead_days)
    }
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> std::result::Result<Self, config::ConfigError> {
        Self::from_source(
            config::Environment::default()
                .separator("__")
                .try_parsing(true),
        )
    }

    fn from_source(
        source: config::Environment,
    ) -> std::result::Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(source)
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> std::result::Result<ServerConfig, config::ConfigError> {
        let env: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ServerConfig::from_source(
            config::Environment::default()
                .separator("__")
                .try_parsing(true)
                .source(Some(env)),
        )
    }

    #[test]
    fn scheduler_config_has_correct_defaults() {
        let config = SchedulerConfig::default();
        assert_eq!(config.timezone, "Asia/Tehran");
        assert_eq!(config.interval_seconds, 60);
        assert_eq!(config.run_budget_seconds, 50);
        assert_eq!(config.lookback_hours, 48);
        assert_eq!(config.meeting_lookahead_days, 30);
        assert_eq!(DatabaseConfig::default().max_connections, 5);
    }

    #[test]
    fn nested_keys_use_double_underscore() {
        let config = load(&[
            ("DATABASE_URL", "postgres://localhost/duebell"),
            ("SCHEDULER__TIMEZONE", "Europe/Berlin"),
            ("SCHEDULER__INTERVAL_SECONDS", "15"),
        ])
        .unwrap();

        assert_eq!(config.database_url, "postgres://localhost/duebell");
        assert_eq!(config.scheduler.timezone, "Europe/Berlin");
        assert_eq!(config.scheduler.runner().interval, Duration::from_secs(15));
        assert_eq!(config.scheduler.runner().budget, Duration::from_secs(50));
        assert_eq!(config.database.max_connections, 5);
    }

    #[test]
    fn database_url_is_required() {
        assert!(load(&[("SCHEDULER__TIMEZONE", "UTC")]).is_err());
    }

    #[test]
    fn invalid_zone_is_reported() {
        let config = SchedulerConfig {
            timezone: "Nowhere/Special".to_string(),
            ..SchedulerConfig::default()
        };
        assert!(config.zone().is_err());
        assert!(SchedulerConfig::default().zone().is_ok());
    }
}
