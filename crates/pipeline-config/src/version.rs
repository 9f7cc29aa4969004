//! Atomic step versioning (§4.A: "atomic updates of a step create a new
//! monotonic version"). Thin wrapper so callers outside `pipeline-store`
//! go through a name that reads as a config-store operation rather than
//! a raw repository method.

use pipeline_store::ConfigRepository;

use crate::error::ConfigError;

pub async fn bump_step_version(config: &ConfigRepository, step_id: i32) -> Result<i32, ConfigError> {
    config.bump_step_version(step_id).await.map_err(ConfigError::from)
}
