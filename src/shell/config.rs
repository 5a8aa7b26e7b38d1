//! Process configuration.
//!
//! Everything comes from `TEAM_STATUS_*` environment variables, for example
//! `TEAM_STATUS_DATABASE_URL` or `TEAM_STATUS_REBUILD_PAGE_SIZE`.

use crate::shared::infrastructure::event_store::SubscriptionConfig;
use config::{Config, Environment};
use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

pub const ENV_PREFIX: &str = "TEAM_STATUS";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error(transparent)]
    Load(#[from] config::ConfigError),

    #[error("invalid setting {field}: {message}")]
    Invalid {
        field: &'static str,
        message: &'static str,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Event log database.
    pub database_url: String,

    /// Read model database. Defaults to `database_url`.
    #[serde(default)]
    pub projection_database_url: Option<String>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_notification_channel")]
    pub notification_channel: String,

    #[serde(default = "default_feed_buffer")]
    pub feed_buffer: usize,

    #[serde(default = "default_rebuild_page_size")]
    pub rebuild_page_size: u64,

    #[serde(default = "default_listener_min_reconnect_secs")]
    pub listener_min_reconnect_secs: u64,

    #[serde(default = "default_listener_max_reconnect_secs")]
    pub listener_max_reconnect_secs: u64,

    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,

    #[serde(default = "default_run_migrations")]
    pub run_migrations: bool,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Prometheus scrape endpoint. No exporter when absent.
    #[serde(default)]
    pub metrics_addr: Option<SocketAddr>,
}

fn default_max_connections() -> u32 { 10 }
fn default_notification_channel() -> String { "events".to_string() }
fn default_feed_buffer() -> usize { 256 }
fn default_rebuild_page_size() -> u64 { 500 }
fn default_listener_min_reconnect_secs() -> u64 { 10 }
fn default_listener_max_reconnect_secs() -> u64 { 60 }
fn default_fetch_timeout_ms() -> u64 { 5000 }
fn default_run_migrations() -> bool { true }
fn default_log_level() -> String { "info".to_string() }

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

impl Settings {
    pub fn load() -> Result<Self, SettingsError> {
        let config = Config::builder().add_source(environment()).build()?;
        Self::from_config(config)
    }

    pub fn from_config(config: Config) -> Result<Self, SettingsError> {
        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if self.rebuild_page_size == 0 {
            return Err(SettingsError::Invalid {
                field: "rebuild_page_size",
                message: "must be greater than zero",
            });
        }
        if self.feed_buffer == 0 {
            return Err(SettingsError::Invalid {
                field: "feed_buffer",
                message: "must be greater than zero",
            });
        }
        if self.listener_min_reconnect_secs > self.listener_max_reconnect_secs {
            return Err(SettingsError::Invalid {
                field: "listener_min_reconnect_secs",
                message: "must not exceed listener_max_reconnect_secs",
            });
        }
        Ok(())
    }

    pub fn projection_database_url(&self) -> &str {
        self.projection_database_url
            .as_deref()
            .unwrap_or(&self.database_url)
    }

    pub fn subscription(&self) -> SubscriptionConfig {
        SubscriptionConfig {
            channel: self.notification_channel.clone(),
            feed_buffer: self.feed_buffer,
            min_reconnect_interval: Duration::from_secs(self.listener_min_reconnect_secs),
            max_reconnect_interval: Duration::from_secs(self.listener_max_reconnect_secs),
            fetch_timeout: Duration::from_millis(self.fetch_timeout_ms),
        }
    }
}

#[cfg(test)]
mod settings_tests {
    use super::*;
    use config::Map;
    use rstest::rstest;

    fn from_env(vars: &[(&str, &str)]) -> Result<Settings, SettingsError> {
        let source: Map<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let config = Config::builder()
            .add_source(environment().source(Some(source)))
            .build()?;
        Settings::from_config(config)
    }

    #[rstest]
    fn it_should_apply_defaults() {
        let settings = from_env(&[("TEAM_STATUS_DATABASE_URL", "postgres://localhost/status")]).unwrap();

        assert_eq!(settings.projection_database_url(), "postgres://localhost/status");
        assert_eq!(settings.max_connections, 10);
        assert_eq!(settings.rebuild_page_size, 500);
        assert!(settings.run_migrations);
        assert_eq!(settings.metrics_addr, None);

        let subscription = settings.subscription();
        assert_eq!(subscription.channel, "events");
        assert_eq!(subscription.feed_buffer, 256);
        assert_eq!(subscription.min_reconnect_interval, Duration::from_secs(10));
        assert_eq!(subscription.max_reconnect_interval, Duration::from_secs(60));
        assert_eq!(subscription.fetch_timeout, Duration::from_secs(5));
    }

    #[rstest]
    fn it_should_read_overrides_from_the_environment() {
        let settings = from_env(&[
            ("TEAM_STATUS_DATABASE_URL", "postgres://localhost/events"),
            ("TEAM_STATUS_PROJECTION_DATABASE_URL", "postgres://localhost/reads"),
            ("TEAM_STATUS_REBUILD_PAGE_SIZE", "50"),
            ("TEAM_STATUS_RUN_MIGRATIONS", "false"),
            ("TEAM_STATUS_METRICS_ADDR", "127.0.0.1:9100"),
        ])
        .unwrap();

        assert_eq!(settings.projection_database_url(), "postgres://localhost/reads");
        assert_eq!(settings.rebuild_page_size, 50);
        assert!(!settings.run_migrations);
        assert_eq!(settings.metrics_addr, Some("127.0.0.1:9100".parse().unwrap()));
    }

    #[rstest]
    fn it_should_require_a_database_url() {
        assert!(matches!(from_env(&[]), Err(SettingsError::Load(_))));
    }

    #[rstest]
    #[case::zero_page_size(("TEAM_STATUS_REBUILD_PAGE_SIZE", "0"), "rebuild_page_size")]
    #[case::zero_buffer(("TEAM_STATUS_FEED_BUFFER", "0"), "feed_buffer")]
    #[case::inverted_backoff(("TEAM_STATUS_LISTENER_MIN_RECONNECT_SECS", "120"), "listener_min_reconnect_secs")]
    fn it_should_reject_inconsistent_values(
        #[case] override_var: (&str, &str),
        #[case] expected_field: &str,
    ) {
        let result = from_env(&[("TEAM_STATUS_DATABASE_URL", "postgres://x"), override_var]);
        match result {
            Err(SettingsError::Invalid { field, .. }) => assert_eq!(field, expected_field),
            other => panic!("expected an invalid setting, got {other:?}"),
        }
    }
}
