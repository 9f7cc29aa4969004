use std::time::Duration;

/// Retention and deadline knobs the sweep loop reads at each tick.
/// `orphan_deadline` mirrors the worker runtime's own `job_deadline`
/// (§4.G): a RUNNING job whose `updated_at` is older than this has no
/// worker left advancing it and is swept to TIMEOUT (§4.I).
#[derive(Debug, Clone, Copy)]
pub struct RetentionPolicy {
    pub orphan_deadline: Duration,
    pub retention_window: Duration,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            orphan_deadline: Duration::from_secs(15 * 60),
            // DATA_RETENTION_HOURS default (§6.5: "jobs older than
            // data_retention_hours (default 24) are deleted").
            retention_window: Duration::from_secs(24 * 60 * 60),
        }
    }
}
