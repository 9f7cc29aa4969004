//! Assembles every component into one running worker process: job store,
//! dispatcher, LLM/privacy/OCR collaborators, worker runtime and
//! maintenance scheduler, torn down together on Ctrl-C.

use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::Duration;

use pipeline_llm::{ChatCompletionsBackend, LlmBackend};
use pipeline_maintenance::{MaintenanceScheduler, RetentionPolicy};
use pipeline_privacy::{PrivacyFilterClient, PrivacyFilterConfig};
use pipeline_queue::{dispatcher::next_worker_id, Dispatcher};
use pipeline_store::{ConfigRepository, EncryptionKey, InteractionLogRepository, JobRepository, Pool, StepExecutionRepository};
use pipeline_worker::{OcrClient, PlainTextOcr, WorkerRuntime, WorkerSettings};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Config;

const POOL_SIZE: usize = 16;

/// Runs the worker process until a shutdown signal arrives. Returns once
/// every spawned task has observed cancellation and stopped.
pub async fn run(config: Config) -> anyhow::Result<()> {
    pipeline_utils::logging::init(config.verbose).map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let pool = Pool::new(&config.database_url, POOL_SIZE)?;
    pipeline_store::migrations::run_migrations(&config.database_url).await?;

    let encryption_key = match &config.encryption_key {
        Some(encoded) => EncryptionKey::from_base64(encoded)?,
        None => {
            warn!("ENCRYPTION_KEY not set, generating an ephemeral key for this process only");
            EncryptionKey::generate()
        }
    };

    let jobs = Arc::new(JobRepository::new(pool.clone(), encryption_key));
    let config_repo = Arc::new(ConfigRepository::new(pool.clone()));
    let step_log = Arc::new(StepExecutionRepository::new(pool.clone()));
    let interaction_log = Arc::new(InteractionLogRepository::new(pool.clone()));

    if let Some(bootstrap_path) = &config.bootstrap_path {
        let bootstrap = pipeline_config::load_bootstrap(bootstrap_path)?;
        let touched = pipeline_config::seed(&config_repo, &bootstrap).await?;
        info!(touched, path = %bootstrap_path, "seeded config store from bootstrap file");
    }

    let dispatcher = Arc::new(Dispatcher::new(jobs.clone()));

    let backend: Arc<dyn LlmBackend> = Arc::new(ChatCompletionsBackend::from_env()?);

    let privacy: Option<Arc<PrivacyFilterClient>> = if config.use_external_pii {
        let base_url = config
            .external_pii_url
            .clone()
            .ok_or_else(|| anyhow::anyhow!("USE_EXTERNAL_PII set but EXTERNAL_PII_URL is missing"))?;
        let api_key = config.external_pii_api_key.clone().unwrap_or_default();
        Some(Arc::new(PrivacyFilterClient::new(PrivacyFilterConfig { base_url, api_key })?))
    } else {
        None
    };

    let ocr: Arc<dyn OcrClient> = Arc::new(PlainTextOcr);

    let settings = WorkerSettings {
        job_deadline: Duration::from_secs(config.job_deadline_seconds),
        max_job_retries: config.max_job_retries,
    };

    let runtime = Arc::new(WorkerRuntime::new(
        dispatcher,
        jobs.clone(),
        config_repo,
        step_log,
        interaction_log,
        backend,
        ocr,
        privacy,
        settings,
    ));

    let cancel = CancellationToken::new();
    let mut tasks = Vec::new();

    let worker_id_counter = Arc::new(AtomicU64::new(0));
    for _ in 0..config.worker_concurrency {
        let runtime = runtime.clone();
        let cancel = cancel.clone();
        let worker_id = next_worker_id(&worker_id_counter);
        tasks.push(tokio::spawn(async move { runtime.run(&worker_id, cancel).await }));
    }

    let retention_policy = RetentionPolicy {
        orphan_deadline: settings.job_deadline,
        retention_window: Duration::from_secs(config.data_retention_hours * 60 * 60),
    };
    let scheduler = MaintenanceScheduler::new(jobs, &config.maintenance_cron, retention_policy)?;
    let scheduler_cancel = cancel.clone();
    tasks.push(tokio::spawn(async move { scheduler.run(scheduler_cancel).await }));

    info!(worker_concurrency = config.worker_concurrency, "docworker-worker started");

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received, draining workers");
    cancel.cancel();

    for task in tasks {
        let _ = task.await;
    }

    info!("docworker-worker stopped");
    Ok(())
}
