use super::parsing::{
    env_optional, env_or_default, parse_bool, parse_environment, parse_grading_apis,
    parse_positive_u64, parse_u16, select_grading_api, validate_http_url,
};
use super::types::{
    ConfigError, DatabaseSettings, ExamSettings, GenerativeSettings, GradingSettings,
    RuntimeSettings, Settings, TelemetrySettings,
};

const DEFAULT_GENERATIVE_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_GENERATIVE_MODEL: &str = "gemini-2.5-flash";

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        let environment = parse_environment(
            env_optional("PASTPAPER_ENV").or_else(|| env_optional("ENVIRONMENT")),
        );
        let strict_config = env_optional("PASTPAPER_STRICT_CONFIG")
            .map(|value| parse_bool(&value))
            .unwrap_or(false)
            || environment.is_production();

        let postgres_server = env_or_default("POSTGRES_SERVER", "localhost");
        let postgres_port = parse_u16("POSTGRES_PORT", env_or_default("POSTGRES_PORT", "5432"))?;
        let postgres_user = env_or_default("POSTGRES_USER", "pastpaper");
        let postgres_password = env_or_default("POSTGRES_PASSWORD", "");
        let postgres_db = env_or_default("POSTGRES_DB", "pastpaper_db");
        let database_url = env_optional("DATABASE_URL");

        let grading_apis = parse_grading_apis(env_optional("ESSAY_GRADING_APIS"))?;
        let api_url = env_optional("ESSAY_GRADING_API_URL")
            .or_else(|| select_grading_api(&grading_apis).map(|api| api.root_url.clone()))
            .map(|url| url.trim_end_matches('/').to_string());
        let api_key = env_optional("ESSAY_GRADING_API_KEY");
        let use_preview =
            env_optional("ESSAY_GRADING_PREVIEW").map(|value| parse_bool(&value)).unwrap_or(true);
        let request_timeout_seconds = parse_positive_u64(
            "GRADING_REQUEST_TIMEOUT_SECONDS",
            env_or_default("GRADING_REQUEST_TIMEOUT_SECONDS", "10"),
        )?;

        let generative_api_key = env_optional("GENERATIVE_API_KEY");
        let generative_base_url =
            env_or_default("GENERATIVE_API_BASE_URL", DEFAULT_GENERATIVE_BASE_URL)
                .trim_end_matches('/')
                .to_string();
        let generative_model = env_or_default("GENERATIVE_MODEL", DEFAULT_GENERATIVE_MODEL);

        let tick_interval_ms = parse_positive_u64(
            "EXAM_TICK_INTERVAL_MS",
            env_or_default("EXAM_TICK_INTERVAL_MS", "1000"),
        )?;

        let log_level = env_or_default("PASTPAPER_LOG_LEVEL", "info");
        let json =
            env_optional("PASTPAPER_LOG_JSON").map(|value| parse_bool(&value)).unwrap_or(false);
        let prometheus_enabled =
            env_optional("PROMETHEUS_ENABLED").map(|value| parse_bool(&value)).unwrap_or(false);

        let settings = Self {
            runtime: RuntimeSettings { environment, strict_config },
            database: DatabaseSettings {
                postgres_server,
                postgres_port,
                postgres_user,
                postgres_password,
                postgres_db,
                database_url,
            },
            grading: GradingSettings { api_url, api_key, use_preview, request_timeout_seconds },
            generative: GenerativeSettings {
                api_key: generative_api_key,
                base_url: generative_base_url,
                model: generative_model,
            },
            exam: ExamSettings { tick_interval_ms },
            telemetry: TelemetrySettings { log_level, json, prometheus_enabled },
        };

        settings.validate()?;

        Ok(settings)
    }

    pub fn database(&self) -> &DatabaseSettings {
        &self.database
    }

    pub fn grading(&self) -> &GradingSettings {
        &self.grading
    }

    pub fn generative(&self) -> &GenerativeSettings {
        &self.generative
    }

    pub fn exam(&self) -> &ExamSettings {
        &self.exam
    }

    pub fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(url) = &self.grading.api_url {
            validate_http_url("ESSAY_GRADING_API_URL", url)?;
        }
        validate_http_url("GENERATIVE_API_BASE_URL", &self.generative.base_url)?;

        if !(self.runtime.strict_config || self.runtime.environment.is_production()) {
            return Ok(());
        }

        if self.database.database_url.is_none() && self.database.postgres_password.is_empty() {
            return Err(ConfigError::MissingSecret("POSTGRES_PASSWORD"));
        }

        if !self.grading.use_preview
            && self.grading.api_url.is_some()
            && self.grading.api_key.is_none()
        {
            return Err(ConfigError::MissingSecret("ESSAY_GRADING_API_KEY"));
        }

        Ok(())
    }
}

impl DatabaseSettings {
    pub fn database_url(&self) -> String {
        if let Some(url) = &self.database_url {
            return url.clone();
        }
        format!(
            "postgresql://{}:{}@{}:{}/{}",
            self.postgres_user,
            self.postgres_password,
            self.postgres_server,
            self.postgres_port,
            self.postgres_db
        )
    }
}
