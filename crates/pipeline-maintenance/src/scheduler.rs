//! Scheduled Maintenance (component I): orphaned-job sweep and retention
//! purge, run from a `cron`-driven in-process loop. The spec treats the
//! scheduler itself as external; this is the minimal in-process stand-in
//! needed for the repo to actually run the sweep *somewhere*.

use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use cron::Schedule;
use pipeline_store::JobRepository;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::MaintenanceError;
use crate::policy::RetentionPolicy;

pub struct MaintenanceScheduler {
    jobs: Arc<JobRepository>,
    schedule: Schedule,
    policy: RetentionPolicy,
}

impl MaintenanceScheduler {
    /// `cron_expr` is a standard 6-field cron expression (seconds-first,
    /// per the `cron` crate's convention), e.g. `"0 */5 * * * *"` for
    /// every 5 minutes.
    pub fn new(jobs: Arc<JobRepository>, cron_expr: &str, policy: RetentionPolicy) -> Result<Self, MaintenanceError> {
        let schedule = Schedule::from_str(cron_expr)
            .map_err(|e| MaintenanceError::InvalidSchedule(cron_expr.to_string(), e.to_string()))?;
        Ok(Self { jobs, schedule, policy })
    }

    /// Runs sweeps at each cron firing until `cancel` fires. Sleeps until
    /// the next scheduled tick rather than polling.
    pub async fn run(&self, cancel: CancellationToken) {
        loop {
            let Some(next) = self.schedule.upcoming(Utc).next() else {
                warn!("maintenance schedule has no upcoming occurrence, stopping");
                return;
            };
            let wait = (next - Utc::now()).to_std().unwrap_or(std::time::Duration::ZERO);

            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(wait) => {}
            }

            if let Err(e) = self.tick().await {
                warn!(error = %e, "maintenance tick failed");
            }
        }
    }

    /// One sweep pass: orphaned RUNNING jobs → TIMEOUT, then expired jobs
    /// purged per the retention window. Exposed separately from `run` so
    /// callers (and tests) can drive a tick without waiting on the clock.
    pub async fn tick(&self) -> Result<(), MaintenanceError> {
        let orphan_cutoff = Utc::now()
            - chrono::Duration::from_std(self.policy.orphan_deadline).unwrap_or(chrono::Duration::zero());
        let swept = self.jobs.sweep_orphaned(orphan_cutoff).await?;
        if swept > 0 {
            info!(count = swept, "swept orphaned jobs to TIMEOUT");
        }

        let retention_cutoff = Utc::now()
            - chrono::Duration::from_std(self.policy.retention_window).unwrap_or(chrono::Duration::zero());
        let purged = self.jobs.purge_expired(retention_cutoff).await?;
        if purged > 0 {
            info!(count = purged, "purged expired jobs past the retention window");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_five_minutes_expression_parses() {
        assert!(Schedule::from_str("0 */5 * * * *").is_ok());
    }

    #[test]
    fn malformed_expression_is_rejected() {
        assert!(Schedule::from_str("not a cron expression").is_err());
    }
}
