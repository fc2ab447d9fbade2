use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub business_rules: BusinessRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

/// Operational knobs for the engine and its background tasks. The sweep
/// timeout here is only the initial default; the live value is persisted as
/// a setting and re-read as a snapshot at the start of every sweep.
#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    #[serde(default = "default_timeout_minutes")]
    pub timeout_minutes: i64,
    #[serde(default = "default_max_cancellations")]
    pub max_cancellations: i64,
    #[serde(default = "default_notification_poll_seconds")]
    pub notification_poll_seconds: u64,
    #[serde(default = "default_notification_batch_size")]
    pub notification_batch_size: i64,
    #[serde(default = "default_notification_max_retries")]
    pub notification_max_retries: i32,
    #[serde(default = "default_pricing_interval_hours")]
    pub pricing_interval_hours: u64,
    #[serde(default = "default_pricing_window_hours")]
    pub pricing_window_hours: i64,
}

fn default_timeout_minutes() -> i64 { 15 }
fn default_max_cancellations() -> i64 { 100 }
fn default_notification_poll_seconds() -> u64 { 30 }
fn default_notification_batch_size() -> i64 { 20 }
fn default_notification_max_retries() -> i32 { 5 }
fn default_pricing_interval_hours() -> u64 { 6 }
fn default_pricing_window_hours() -> i64 { 48 }

impl Default for BusinessRules {
    fn default() -> Self {
        Self {
            timeout_minutes: default_timeout_minutes(),
            max_cancellations: default_max_cancellations(),
            notification_poll_seconds: default_notification_poll_seconds(),
            notification_batch_size: default_notification_batch_size(),
            notification_max_retries: default_notification_max_retries(),
            pricing_interval_hours: default_pricing_interval_hours(),
            pricing_window_hours: default_pricing_window_hours(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Environment-specific overrides, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // `ROTA__SERVER__PORT=8080` style environment overrides
            .add_source(config::Environment::with_prefix("ROTA").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
