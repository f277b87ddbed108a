//! Handles settings for the application. Configuration is written in
//! `settings.toml` and can be overridden with `WELTH__`-prefixed environment
//! variables (`WELTH__SERVER__PORT=8080`).
//!
//! See `settings.toml` for the configuration.
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use engine::{AlertPolicy, BudgetSelection, SpendPeriod};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct App {
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

impl Database {
    pub fn url(&self) -> String {
        match self {
            Database::Memory => String::from("sqlite::memory:"),
            Database::Sqlite(path) => format!("sqlite:{path}?mode=rwc"),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Server {
    pub bind: Option<String>,
    pub port: u16,
    pub database: Database,
}

impl Server {
    pub fn addr(&self) -> String {
        let bind = self.bind.as_deref().unwrap_or("127.0.0.1");
        format!("{bind}:{}", self.port)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct Alerts {
    /// Minutes between two alert runs; no periodic run when absent.
    pub interval_minutes: Option<u64>,
    pub timezone: Option<String>,
    #[serde(default)]
    pub selection: BudgetSelection,
    #[serde(default)]
    pub period: SpendPeriod,
}

impl Alerts {
    /// Time between two periodic runs, at least one minute.
    pub fn interval(&self) -> Option<Duration> {
        self.interval_minutes
            .map(|minutes| Duration::from_secs(minutes.max(1).saturating_mul(60)))
    }

    pub fn policy(&self) -> Result<AlertPolicy, ConfigError> {
        let timezone = match &self.timezone {
            Some(name) => name
                .parse()
                .map_err(|_| ConfigError::Message(format!("unknown time zone: {name}")))?,
            None => chrono_tz::Tz::UTC,
        };
        Ok(AlertPolicy {
            selection: self.selection,
            period: self.period,
            timezone,
        })
    }
}

#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Notifier {
    /// Write alerts to the log instead of delivering them.
    Log,
    /// POST every alert as JSON to `url`.
    Webhook {
        url: String,
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },
}

fn default_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub app: App,
    pub server: Server,
    #[serde(default)]
    pub alerts: Alerts,
    pub notifier: Option<Notifier>,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_config(
            Config::builder()
                .add_source(File::with_name("settings").required(false))
                .add_source(Environment::with_prefix("WELTH").separator("__")),
        )
    }

    fn from_config(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, ConfigError> {
        builder.build()?.try_deserialize()
    }
}
