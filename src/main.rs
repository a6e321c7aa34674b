use anyhow::{Context, Result};
use tracing::{error, info};

use code_runner::engine::{Engine, EngineConfig};
use code_runner::jobs::{ExecutionJob, ExecutionReport};
use code_runner::languages::Languages;
use code_runner::redis_manager::RedisManager;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("code_runner=info".parse()?),
        )
        .init();

    dotenvy::dotenv().ok();

    let languages = Languages::from_env().context("Failed to load language configurations")?;

    let config = EngineConfig::from_env()?;
    info!(
        "Engine config: timeout={}s, log_dir={:?}, root={:?}, runner={:?}",
        config.timeout.as_secs(),
        config.log_dir,
        config.root,
        config.runner
    );
    let engine = Engine::new(config, &languages);
    info!(
        "Registered languages: {}",
        engine.registry().languages().join(", ")
    );

    info!("Starting Code Runner worker...");
    let mut redis = RedisManager::from_env().await?;

    info!("Waiting for jobs...");

    loop {
        let job = redis.pop_job().await?;
        let report = process_job(&engine, job).await;

        if let Err(e) = redis.store_report(&report).await {
            error!("Failed to store report for {}: {:?}", report.request_id, e);
        }
    }
}

async fn process_job(engine: &Engine, job: ExecutionJob) -> ExecutionReport {
    info!("Processing request {} ({})", job.request_id, job.language);

    let result = engine.execute(&job.language, job.code, job.settings).await;
    let report = ExecutionReport::new(job.request_id, &result);

    info!("Request {} finished: {}", report.request_id, report.verdict);
    report
}
