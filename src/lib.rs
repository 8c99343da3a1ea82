pub mod core;
pub mod db;
pub mod errors;
pub(crate) mod repositories;
pub mod schemas;
pub mod services;

#[cfg(test)]
mod test_support;

use anyhow::Context;

pub use crate::core::{config::Settings, state::AppState};
pub use crate::errors::{ExamError, StoreError};
pub use crate::services::exam_session::{
    ExamAttempt, ExamSessionManager, SubmitOutcome, SubmitTrigger,
};
pub use crate::services::grading::{Grader, GradingStrategy};
pub use crate::services::topic_practice::TopicPractice;

/// Loads configuration, installs tracing and metrics, connects and migrates the database and
/// checks the essay grading service health.
pub async fn bootstrap() -> anyhow::Result<AppState> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    core::telemetry::init_tracing(&settings)?;
    core::metrics::init(&settings)?;

    let db_pool = db::init_pool(&settings).await.context("Failed to connect to Postgres")?;
    db::run_migrations(&db_pool).await.context("Failed to run migrations")?;

    let grader = Grader::from_settings(&settings)?;
    if let Some(client) = grader.essay_client().filter(|client| client.has_endpoint()) {
        if client.check_health().await {
            tracing::info!("Essay grading service healthy");
        } else {
            tracing::warn!("Essay grading service unhealthy; essays may fall back to keywords");
        }
    }

    tracing::info!(
        environment = %settings.runtime().environment.as_str(),
        external_grading = grader.external_configured(),
        "Past paper grader ready"
    );

    Ok(AppState::new(settings, db_pool, grader))
}
