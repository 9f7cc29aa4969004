//! Process configuration: environment variables first-class, an optional
//! `pipeline.toml` for local overrides, defaults last (§4.L — no CLI
//! layer, this process has no interactive surface).

use std::env;
use std::path::Path;

use serde::Deserialize;

const DEFAULT_DATABASE_URL: &str = "docworker.sqlite";
const DEFAULT_WORKER_CONCURRENCY: usize = 4;
const DEFAULT_JOB_DEADLINE_SECONDS: u64 = 15 * 60;
const DEFAULT_MAX_JOB_RETRIES: i32 = 1;
const DEFAULT_DATA_RETENTION_HOURS: u64 = 24;
const DEFAULT_MAINTENANCE_CRON: &str = "0 */5 * * * *";

#[derive(Debug, Clone, Deserialize, Default)]
struct FileOverrides {
    database_url: Option<String>,
    worker_concurrency: Option<usize>,
    job_deadline_seconds: Option<u64>,
    max_job_retries: Option<i32>,
    data_retention_hours: Option<u64>,
    maintenance_cron: Option<String>,
    verbose: Option<bool>,
    bootstrap_path: Option<String>,
}

/// Fully resolved process configuration. Secrets (`ovh_ai_access_token`,
/// `external_pii_api_key`, `encryption_key`) are read straight from the
/// environment by their respective collaborator crates
/// ([`pipeline_llm::ChatCompletionsBackend::from_env`],
/// [`pipeline_privacy::PrivacyFilterClient`], [`pipeline_store::EncryptionKey`])
/// rather than round-tripped through this struct.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub worker_concurrency: usize,
    pub job_deadline_seconds: u64,
    pub max_job_retries: i32,
    pub data_retention_hours: u64,
    pub maintenance_cron: String,
    pub use_external_pii: bool,
    pub external_pii_url: Option<String>,
    pub external_pii_api_key: Option<String>,
    pub encryption_key: Option<String>,
    pub bootstrap_path: Option<String>,
    pub verbose: bool,
}

impl Config {
    /// Loads configuration with precedence: environment > `pipeline.toml`
    /// (if present in the current directory, or at `PIPELINE_CONFIG_PATH`)
    /// > defaults.
    pub fn load() -> Self {
        let file_path = env::var("PIPELINE_CONFIG_PATH").unwrap_or_else(|_| "pipeline.toml".to_string());
        let file = Self::load_file(Path::new(&file_path)).unwrap_or_default();

        let database_url = env::var("DATABASE_URL")
            .ok()
            .or(file.database_url)
            .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let worker_concurrency = env::var("WORKER_CONCURRENCY")
            .ok()
            .and_then(|v| v.parse().ok())
            .or(file.worker_concurrency)
            .unwrap_or(DEFAULT_WORKER_CONCURRENCY);

        let job_deadline_seconds = env::var("JOB_DEADLINE_SECONDS")
            .ok()
            .and_then(|v| v.parse().ok())
            .or(file.job_deadline_seconds)
            .unwrap_or(DEFAULT_JOB_DEADLINE_SECONDS);

        let max_job_retries = env::var("MAX_JOB_RETRIES")
            .ok()
            .and_then(|v| v.parse().ok())
            .or(file.max_job_retries)
            .unwrap_or(DEFAULT_MAX_JOB_RETRIES);

        let data_retention_hours = env::var("DATA_RETENTION_HOURS")
            .ok()
            .and_then(|v| v.parse().ok())
            .or(file.data_retention_hours)
            .unwrap_or(DEFAULT_DATA_RETENTION_HOURS);

        let maintenance_cron = env::var("MAINTENANCE_CRON")
            .ok()
            .or(file.maintenance_cron)
            .unwrap_or_else(|| DEFAULT_MAINTENANCE_CRON.to_string());

        let use_external_pii =
            env::var("USE_EXTERNAL_PII").ok().map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false);

        let verbose = env::var("PIPELINE_VERBOSE")
            .ok()
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .or(file.verbose)
            .unwrap_or(false);

        Self {
            database_url,
            worker_concurrency,
            job_deadline_seconds,
            max_job_retries,
            data_retention_hours,
            maintenance_cron,
            use_external_pii,
            external_pii_url: env::var("EXTERNAL_PII_URL").ok(),
            external_pii_api_key: env::var("EXTERNAL_PII_API_KEY").ok(),
            encryption_key: env::var("ENCRYPTION_KEY").ok(),
            bootstrap_path: env::var("BOOTSTRAP_PATH").ok().or(file.bootstrap_path),
            verbose,
        }
    }

    fn load_file(path: &Path) -> Option<FileOverrides> {
        let contents = std::fs::read_to_string(path).ok()?;
        toml::from_str(&contents).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        // SAFETY: test-only env mutation, no concurrent access in this process's test binary.
        unsafe {
            env::remove_var("DATABASE_URL");
            env::remove_var("WORKER_CONCURRENCY");
        }
        let config = Config::load();
        assert_eq!(config.worker_concurrency, DEFAULT_WORKER_CONCURRENCY);
        assert_eq!(config.max_job_retries, DEFAULT_MAX_JOB_RETRIES);
    }
}
