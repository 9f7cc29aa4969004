//! Enqueue/dequeue across the four lanes, backed by the job store's
//! atomic claim. There is no separate broker process: "pushing onto a
//! lane" is writing `lane` + `QUEUED` on the job row, and "popping" is
//! `JobRepository::claim_from_lane` tried in strict priority order.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use pipeline_store::{Job, JobRepository};
use tokio::sync::{Mutex, Notify};
use tokio::time::sleep;

use crate::error::QueueError;
use crate::lane::Lane;

const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Reserved (popped but not yet complete) count per worker, and queue
/// depth per lane (§4.F counters).
#[derive(Default)]
struct Counters {
    reserved_per_worker: Mutex<HashMap<String, u64>>,
}

pub struct Dispatcher {
    store: Arc<JobRepository>,
    counters: Counters,
    notify: Notify,
}

impl Dispatcher {
    pub fn new(store: Arc<JobRepository>) -> Self {
        Self { store, counters: Counters::default(), notify: Notify::new() }
    }

    /// Transitions a PENDING job into `lane`, QUEUED. Wakes any worker
    /// blocked in [`Dispatcher::dequeue`].
    pub async fn enqueue(&self, job_id: &str) -> Result<bool, QueueError> {
        let queued = self.store.mark_queued(job_id).await?;
        if queued {
            self.notify.notify_waiters();
        }
        Ok(queued)
    }

    /// BLPOP-style wait across all lanes in strict priority order
    /// (high_priority → default → low_priority → maintenance). Returns as
    /// soon as any lane yields a job; otherwise waits for the next
    /// enqueue notification before polling again.
    pub async fn dequeue(&self, worker_id: &str) -> Result<Job, QueueError> {
        loop {
            for lane in Lane::ALL_IN_PRIORITY_ORDER {
                if let Some(job) = self.store.claim_from_lane(lane.as_str()).await? {
                    self.mark_reserved(worker_id).await;
                    return Ok(job);
                }
            }

            tokio::select! {
                _ = self.notify.notified() => {}
                _ = sleep(POLL_INTERVAL) => {}
            }
        }
    }

    /// Moves a RUNNING job back to QUEUED in `new_lane` and wakes any
    /// parked dequeue, the job-level requeue path a worker takes after a
    /// retryable failure (§4.G, lane demotion via [`Lane::demoted`]).
    pub async fn requeue(&self, job_id: &str, new_lane: Lane) -> Result<bool, QueueError> {
        let requeued = self.store.requeue_to_lane(job_id, new_lane.as_str()).await?;
        if requeued {
            self.notify.notify_waiters();
        }
        Ok(requeued)
    }

    pub async fn release(&self, worker_id: &str) {
        let mut reserved = self.counters.reserved_per_worker.lock().await;
        if let Some(count) = reserved.get_mut(worker_id) {
            *count = count.saturating_sub(1);
        }
    }

    async fn mark_reserved(&self, worker_id: &str) {
        let mut reserved = self.counters.reserved_per_worker.lock().await;
        *reserved.entry(worker_id.to_string()).or_insert(0) += 1;
    }

    pub async fn reserved_count(&self, worker_id: &str) -> u64 {
        *self.counters.reserved_per_worker.lock().await.get(worker_id).unwrap_or(&0)
    }

    pub async fn queue_depth(&self, lane: Lane) -> Result<i64, QueueError> {
        self.store.queue_depth(lane.as_str()).await.map_err(QueueError::from)
    }
}

/// Process-wide sequence for generating worker identifiers.
pub fn next_worker_id(counter: &AtomicU64) -> String {
    format!("worker-{}", counter.fetch_add(1, Ordering::Relaxed))
}
