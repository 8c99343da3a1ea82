mod parsing;
mod settings;
mod types;

pub use types::{
    ConfigError, DatabaseSettings, Environment, ExamSettings, GenerativeSettings, GradingApi,
    GradingSettings, RuntimeSettings, Settings, TelemetrySettings,
};
