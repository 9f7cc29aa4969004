//! CRUD and the atomic job-claim transaction.
//!
//! The claim pattern (select the oldest eligible row, then CAS its status
//! inside the same transaction) is the same shape as a work-queue claim
//! over any row-based table: read the candidate, flip its status with a
//! `WHERE status = <old>` guard, and only the worker that wins the update
//! treats the row as its own.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncConnection, RunQueryDsl};

use crate::encryption::EncryptionKey;
use crate::error::StoreError;
use crate::models::{
    Job, JobRecord, JobStatus, NewJobRecord, NewStepExecutionRecord, StepExecution, StepStatus,
    StepExecutionRecord,
};
use crate::pool::Pool;
use crate::schema::{jobs, step_executions};
use crate::with_conn;

fn now_str() -> String {
    Utc::now().to_rfc3339()
}

fn parse_ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

pub struct JobRepository {
    pool: Pool,
    key: EncryptionKey,
}

impl JobRepository {
    pub fn new(pool: Pool, key: EncryptionKey) -> Self {
        Self { pool, key }
    }

    fn decode(&self, record: JobRecord) -> Result<Job, StoreError> {
        Ok(Job {
            job_id: record.job_id,
            processing_id: record.processing_id,
            lane: record.lane,
            retry_count: record.retry_count,
            filename: record.filename,
            file_type: record.file_type,
            file_size: record.file_size,
            file_content: self.key.decrypt(&record.file_content)?,
            pipeline_config: serde_json::from_str(&record.pipeline_config)
                .map_err(|e| StoreError::Codec(e.to_string()))?,
            ocr_config: serde_json::from_str(&record.ocr_config)
                .map_err(|e| StoreError::Codec(e.to_string()))?,
            target_language: record.target_language,
            document_class: record.document_class,
            status: JobStatus::from_str(&record.status)
                .ok_or_else(|| StoreError::Codec(format!("unknown job status {}", record.status)))?,
            progress_percent: record.progress_percent.clamp(0, 100) as u8,
            current_step: record.current_step,
            original_text: record
                .original_text
                .as_deref()
                .map(|b| self.key.decrypt_str(b))
                .transpose()?,
            simplified_text: record
                .simplified_text
                .as_deref()
                .map(|b| self.key.decrypt_str(b))
                .transpose()?,
            translated_text: record
                .translated_text
                .as_deref()
                .map(|b| self.key.decrypt_str(b))
                .transpose()?,
            result_data: record
                .result_data
                .as_deref()
                .map(serde_json::from_str)
                .transpose()
                .map_err(|e| StoreError::Codec(e.to_string()))?,
            error_message: record.error_message,
            total_tokens: record.total_tokens,
            total_cost: record.total_cost,
            created_at: parse_ts(&record.created_at),
            updated_at: parse_ts(&record.updated_at),
            completed_at: record.completed_at.as_deref().map(parse_ts),
        })
    }

    /// Inserts a new job in `PENDING` with the pipeline/OCR config snapshot
    /// frozen at enqueue time (§4.A: later config changes never affect an
    /// already-enqueued job).
    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        job_id: &str,
        processing_id: &str,
        lane: &str,
        filename: &str,
        file_type: &str,
        file_content: &[u8],
        pipeline_config: &serde_json::Value,
        ocr_config: &serde_json::Value,
        target_language: Option<&str>,
    ) -> Result<(), StoreError> {
        let sealed_content = self.key.encrypt(file_content)?;
        let now = now_str();
        let record = NewJobRecord {
            job_id: job_id.to_string(),
            processing_id: processing_id.to_string(),
            lane: lane.to_string(),
            retry_count: 0,
            filename: filename.to_string(),
            file_type: file_type.to_string(),
            file_size: file_content.len() as i64,
            file_content: sealed_content,
            pipeline_config: serde_json::to_string(pipeline_config)
                .map_err(|e| StoreError::Codec(e.to_string()))?,
            ocr_config: serde_json::to_string(ocr_config)
                .map_err(|e| StoreError::Codec(e.to_string()))?,
            target_language: target_language.map(str::to_string),
            document_class: None,
            status: JobStatus::Pending.as_str().to_string(),
            progress_percent: 0,
            current_step: None,
            total_tokens: 0,
            total_cost: 0.0,
            created_at: now.clone(),
            updated_at: now,
        };

        with_conn!(self.pool, conn, {
            diesel::insert_into(jobs::table)
                .values(&record)
                .execute(&mut conn)
                .await?;
            Ok(())
        })
    }

    pub async fn find(&self, job_id: &str) -> Result<Job, StoreError> {
        let record: JobRecord = with_conn!(self.pool, conn, {
            jobs::table
                .filter(jobs::job_id.eq(job_id))
                .first(&mut conn)
                .await
                .optional()?
                .ok_or_else(|| StoreError::JobNotFound(job_id.to_string()))
        })?;
        self.decode(record)
    }

    pub async fn find_by_processing_id(&self, processing_id: &str) -> Result<Job, StoreError> {
        let record: JobRecord = with_conn!(self.pool, conn, {
            jobs::table
                .filter(jobs::processing_id.eq(processing_id))
                .first(&mut conn)
                .await
                .optional()?
                .ok_or_else(|| StoreError::JobNotFound(processing_id.to_string()))
        })?;
        self.decode(record)
    }

    /// Atomically transitions a PENDING job to QUEUED. Returns `false`
    /// without error if another caller already won the race, matching the
    /// row-level CAS discipline in §5.
    pub async fn mark_queued(&self, job_id: &str) -> Result<bool, StoreError> {
        let job_id = job_id.to_string();
        with_conn!(self.pool, conn, {
            conn.transaction(|conn| {
                let job_id = job_id.clone();
                Box::pin(async move {
                    let updated = diesel::update(
                        jobs::table
                            .filter(jobs::job_id.eq(&job_id))
                            .filter(jobs::status.eq(JobStatus::Pending.as_str())),
                    )
                    .set((jobs::status.eq(JobStatus::Queued.as_str()), jobs::updated_at.eq(now_str())))
                    .execute(conn)
                    .await?;
                    Ok(updated > 0)
                })
            })
            .await
        })
    }

    /// Atomically claims the oldest QUEUED job in `lane` and transitions it
    /// to RUNNING in the same transaction, so exactly one worker wins it
    /// (§5: "only one worker can transition QUEUED→RUNNING"). The caller
    /// (the dispatcher in `pipeline-queue`) tries lanes in strict priority
    /// order and stops at the first one that yields a job.
    pub async fn claim_from_lane(&self, lane: &str) -> Result<Option<Job>, StoreError> {
        let lane = lane.to_string();
        let record: Option<JobRecord> = with_conn!(self.pool, conn, {
            conn.transaction(|conn| {
                let lane = lane.clone();
                Box::pin(async move {
                    let candidate: Option<JobRecord> = jobs::table
                        .filter(jobs::status.eq(JobStatus::Queued.as_str()))
                        .filter(jobs::lane.eq(&lane))
                        .order(jobs::created_at.asc())
                        .limit(1)
                        .first(conn)
                        .await
                        .optional()?;

                    let Some(candidate) = candidate else {
                        return Ok::<_, StoreError>(None);
                    };

                    let updated = diesel::update(
                        jobs::table
                            .filter(jobs::job_id.eq(&candidate.job_id))
                            .filter(jobs::status.eq(JobStatus::Queued.as_str())),
                    )
                    .set((jobs::status.eq(JobStatus::Running.as_str()), jobs::updated_at.eq(now_str())))
                    .execute(conn)
                    .await?;

                    if updated == 0 {
                        // Lost the race to another worker between the read and the CAS.
                        return Ok(None);
                    }

                    let mut claimed = candidate;
                    claimed.status = JobStatus::Running.as_str().to_string();
                    Ok(Some(claimed))
                })
            })
            .await
        })?;

        record.map(|r| self.decode(r)).transpose()
    }

    /// Moves a RUNNING job back to QUEUED in `new_lane` (§4.G: job-level
    /// requeue after a retryable failure, demoting one lane per §4.F).
    /// Returns `false` if the job wasn't RUNNING (another worker already
    /// finished or requeued it).
    pub async fn requeue_to_lane(&self, job_id: &str, new_lane: &str) -> Result<bool, StoreError> {
        let job_id = job_id.to_string();
        let new_lane = new_lane.to_string();
        with_conn!(self.pool, conn, {
            conn.transaction(|conn| {
                let job_id = job_id.clone();
                let new_lane = new_lane.clone();
                Box::pin(async move {
                    let updated = diesel::update(
                        jobs::table
                            .filter(jobs::job_id.eq(&job_id))
                            .filter(jobs::status.eq(JobStatus::Running.as_str())),
                    )
                    .set((
                        jobs::status.eq(JobStatus::Queued.as_str()),
                        jobs::lane.eq(&new_lane),
                        jobs::retry_count.eq(jobs::retry_count + 1),
                        jobs::updated_at.eq(now_str()),
                    ))
                    .execute(conn)
                    .await?;
                    Ok(updated > 0)
                })
            })
            .await
        })
    }

    /// Number of QUEUED jobs waiting in `lane` (§4.F: "queue depth per
    /// lane").
    pub async fn queue_depth(&self, lane: &str) -> Result<i64, StoreError> {
        let lane = lane.to_string();
        with_conn!(self.pool, conn, {
            jobs::table
                .filter(jobs::status.eq(JobStatus::Queued.as_str()))
                .filter(jobs::lane.eq(&lane))
                .count()
                .get_result(&mut conn)
                .await
                .map_err(StoreError::from)
        })
    }

    pub async fn update_progress(
        &self,
        job_id: &str,
        progress_percent: u8,
        current_step: Option<&str>,
    ) -> Result<(), StoreError> {
        with_conn!(self.pool, conn, {
            diesel::update(jobs::table.filter(jobs::job_id.eq(job_id)))
                .set((
                    jobs::progress_percent.eq(progress_percent as i32),
                    jobs::current_step.eq(current_step),
                    jobs::updated_at.eq(now_str()),
                ))
                .execute(&mut conn)
                .await?;
            Ok(())
        })
    }

    /// Accrues tokens/cost monotonically (§3 invariant 4): never sets a
    /// lower value than what is already stored.
    pub async fn accrue_cost(&self, job_id: &str, tokens: i64, cost: f64) -> Result<(), StoreError> {
        with_conn!(self.pool, conn, {
            diesel::update(jobs::table.filter(jobs::job_id.eq(job_id)))
                .set((
                    jobs::total_tokens.eq(jobs::total_tokens + tokens),
                    jobs::total_cost.eq(jobs::total_cost + cost),
                    jobs::updated_at.eq(now_str()),
                ))
                .execute(&mut conn)
                .await?;
            Ok(())
        })
    }

    pub async fn set_document_class(&self, job_id: &str, class_key: &str) -> Result<(), StoreError> {
        with_conn!(self.pool, conn, {
            diesel::update(jobs::table.filter(jobs::job_id.eq(job_id)))
                .set((jobs::document_class.eq(class_key), jobs::updated_at.eq(now_str())))
                .execute(&mut conn)
                .await?;
            Ok(())
        })
    }

    pub async fn complete(
        &self,
        job_id: &str,
        status: JobStatus,
        original_text: Option<&str>,
        simplified_text: Option<&str>,
        translated_text: Option<&str>,
        result_data: Option<&serde_json::Value>,
        error_message: Option<&str>,
    ) -> Result<(), StoreError> {
        let original_sealed = original_text.map(|t| self.key.encrypt_str(t)).transpose()?;
        let simplified_sealed = simplified_text.map(|t| self.key.encrypt_str(t)).transpose()?;
        let translated_sealed = translated_text.map(|t| self.key.encrypt_str(t)).transpose()?;
        let result_json = result_data
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| StoreError::Codec(e.to_string()))?;
        let now = now_str();

        with_conn!(self.pool, conn, {
            diesel::update(jobs::table.filter(jobs::job_id.eq(job_id)))
                .set((
                    jobs::status.eq(status.as_str()),
                    jobs::original_text.eq(original_sealed),
                    jobs::simplified_text.eq(simplified_sealed),
                    jobs::translated_text.eq(translated_sealed),
                    jobs::result_data.eq(result_json),
                    jobs::error_message.eq(error_message),
                    jobs::updated_at.eq(now.clone()),
                    jobs::completed_at.eq(now),
                ))
                .execute(&mut conn)
                .await?;
            Ok(())
        })
    }

    /// Orphaned-job sweep (§4.I): RUNNING jobs whose `updated_at` is older
    /// than `deadline` are forced to TIMEOUT.
    pub async fn sweep_orphaned(&self, deadline: DateTime<Utc>) -> Result<u64, StoreError> {
        let cutoff = deadline.to_rfc3339();
        with_conn!(self.pool, conn, {
            let updated = diesel::update(
                jobs::table
                    .filter(jobs::status.eq(JobStatus::Running.as_str()))
                    .filter(jobs::updated_at.lt(&cutoff)),
            )
            .set((jobs::status.eq(JobStatus::Timeout.as_str()), jobs::updated_at.eq(now_str())))
            .execute(&mut conn)
            .await?;
            Ok(updated as u64)
        })
    }

    /// Retention purge (§6.5): deletes jobs older than the retention
    /// window along with their StepExecution children.
    pub async fn purge_expired(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let cutoff = cutoff.to_rfc3339();
        with_conn!(self.pool, conn, {
            conn.transaction(|conn| {
                let cutoff = cutoff.clone();
                Box::pin(async move {
                    let expired_ids: Vec<String> = jobs::table
                        .filter(jobs::created_at.lt(&cutoff))
                        .select(jobs::job_id)
                        .load(conn)
                        .await?;

                    if expired_ids.is_empty() {
                        return Ok(0u64);
                    }

                    diesel::delete(
                        step_executions::table.filter(step_executions::job_id.eq_any(&expired_ids)),
                    )
                    .execute(conn)
                    .await?;

                    let deleted = diesel::delete(jobs::table.filter(jobs::job_id.eq_any(&expired_ids)))
                        .execute(conn)
                        .await?;
                    Ok(deleted as u64)
                })
            })
            .await
        })
    }
}

pub struct StepExecutionRepository {
    pool: Pool,
}

impl StepExecutionRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    fn decode(record: StepExecutionRecord) -> Result<StepExecution, StoreError> {
        Ok(StepExecution {
            id: record.id,
            job_id: record.job_id,
            step_name: record.step_name,
            step_order: record.step_order,
            status: StepStatus::from_str(&record.status)
                .ok_or_else(|| StoreError::Codec(format!("unknown step status {}", record.status)))?,
            started_at: record.started_at.as_deref().map(parse_ts),
            completed_at: record.completed_at.as_deref().map(parse_ts),
            duration_ms: record.duration_ms,
            input_text: record.input_text,
            output_text: record.output_text,
            error_message: record.error_message,
            model_used: record.model_used,
            input_tokens: record.input_tokens,
            output_tokens: record.output_tokens,
            cost: record.cost,
        })
    }

    /// Inserts a PENDING row for a step about to run. `step_order` is the
    /// global ordering position the executor computed (§3: StepExecution
    /// keyed by `(job_id, step_order)`).
    pub async fn start(
        &self,
        job_id: &str,
        step_name: &str,
        step_order: i32,
        input_text: Option<&str>,
    ) -> Result<i32, StoreError> {
        let record = NewStepExecutionRecord {
            job_id: job_id.to_string(),
            step_name: step_name.to_string(),
            step_order,
            status: StepStatus::Running.as_str().to_string(),
            started_at: Some(now_str()),
            input_text: input_text.map(str::to_string),
        };

        with_conn!(self.pool, conn, {
            diesel::insert_into(step_executions::table)
                .values(&record)
                .execute(&mut conn)
                .await?;

            let inserted: StepExecutionRecord = step_executions::table
                .filter(step_executions::job_id.eq(job_id))
                .filter(step_executions::step_order.eq(step_order))
                .first(&mut conn)
                .await?;
            Ok(inserted.id)
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn finish(
        &self,
        id: i32,
        status: StepStatus,
        output_text: Option<&str>,
        error_message: Option<&str>,
        model_used: Option<&str>,
        input_tokens: Option<i64>,
        output_tokens: Option<i64>,
        cost: Option<f64>,
        duration_ms: i64,
    ) -> Result<(), StoreError> {
        with_conn!(self.pool, conn, {
            diesel::update(step_executions::table.filter(step_executions::id.eq(id)))
                .set((
                    step_executions::status.eq(status.as_str()),
                    step_executions::output_text.eq(output_text),
                    step_executions::error_message.eq(error_message),
                    step_executions::model_used.eq(model_used),
                    step_executions::input_tokens.eq(input_tokens),
                    step_executions::output_tokens.eq(output_tokens),
                    step_executions::cost.eq(cost),
                    step_executions::duration_ms.eq(duration_ms),
                    step_executions::completed_at.eq(now_str()),
                ))
                .execute(&mut conn)
                .await?;
            Ok(())
        })
    }

    pub async fn for_job(&self, job_id: &str) -> Result<Vec<StepExecution>, StoreError> {
        let records: Vec<StepExecutionRecord> = with_conn!(self.pool, conn, {
            step_executions::table
                .filter(step_executions::job_id.eq(job_id))
                .order(step_executions::step_order.asc())
                .load(&mut conn)
                .await
                .map_err(StoreError::from)
        })?;
        records.into_iter().map(Self::decode).collect()
    }
}
