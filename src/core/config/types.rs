use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Settings {
    pub(super) runtime: RuntimeSettings,
    pub(super) database: DatabaseSettings,
    pub(super) grading: GradingSettings,
    pub(super) generative: GenerativeSettings,
    pub(super) exam: ExamSettings,
    pub(super) telemetry: TelemetrySettings,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub postgres_server: String,
    pub postgres_port: u16,
    pub postgres_user: String,
    pub postgres_password: String,
    pub postgres_db: String,
    pub database_url: Option<String>,
}

/// Essay grading service. `api_url == None` means no dedicated service is configured.
#[derive(Debug, Clone)]
pub struct GradingSettings {
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub use_preview: bool,
    pub request_timeout_seconds: u64,
}

/// Generative-text service used as a grading oracle when no essay service is configured.
#[derive(Debug, Clone)]
pub struct GenerativeSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct ExamSettings {
    pub tick_interval_ms: u64,
}

#[derive(Debug, Clone)]
pub struct TelemetrySettings {
    pub log_level: String,
    pub json: bool,
    pub prometheus_enabled: bool,
}

#[derive(Debug, Clone)]
pub struct RuntimeSettings {
    pub environment: Environment,
    pub strict_config: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
    Staging,
    Test,
}

/// One entry of `ESSAY_GRADING_APIS`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct GradingApi {
    pub name: String,
    pub root_url: String,
}

impl Environment {
    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
            Environment::Staging => "staging",
            Environment::Test => "test",
        }
    }

    pub(super) fn is_production(self) -> bool {
        matches!(self, Environment::Production)
    }
}

impl GradingSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl GenerativeSettings {
    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|key| !key.is_empty())
    }
}

impl ExamSettings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

impl Default for ExamSettings {
    fn default() -> Self {
        Self { tick_interval_ms: 1000 }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
    #[error("invalid grading api list: {0}")]
    InvalidGradingApis(String),
    #[error("missing required secret for {0}")]
    MissingSecret(&'static str),
}
