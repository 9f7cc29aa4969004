//! AI interaction logging: one row per LLM call, independent of
//! StepExecution rows (§3: retries may produce multiple logs per step,
//! the last one wins for `model_used` on the step).

use diesel::Insertable;
use diesel_async::RunQueryDsl;

use crate::error::StoreError;
use crate::pool::Pool;
use crate::schema::ai_interaction_logs;
use crate::with_conn;

#[derive(Insertable, Debug)]
#[diesel(table_name = ai_interaction_logs)]
struct NewAiInteractionLog {
    job_id: String,
    step_execution_id: Option<i32>,
    model: String,
    input_tokens: i64,
    output_tokens: i64,
    cost: f64,
    latency_ms: i64,
    success: bool,
    error_code: Option<String>,
    created_at: String,
}

pub struct InteractionLogRepository {
    pool: Pool,
}

impl InteractionLogRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn record(
        &self,
        job_id: &str,
        step_execution_id: Option<i32>,
        model: &str,
        input_tokens: i64,
        output_tokens: i64,
        cost: f64,
        latency_ms: i64,
        success: bool,
        error_code: Option<&str>,
    ) -> Result<(), StoreError> {
        let record = NewAiInteractionLog {
            job_id: job_id.to_string(),
            step_execution_id,
            model: model.to_string(),
            input_tokens,
            output_tokens,
            cost,
            latency_ms,
            success,
            error_code: error_code.map(str::to_string),
            created_at: chrono::Utc::now().to_rfc3339(),
        };

        with_conn!(self.pool, conn, {
            diesel::insert_into(ai_interaction_logs::table)
                .values(&record)
                .execute(&mut conn)
                .await?;
            Ok(())
        })
    }
}
