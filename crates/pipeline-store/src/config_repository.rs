//! Config Store (component A): PipelineStep/DocumentClass/Model/
//! SystemSetting/FeatureFlag reads, with a process-local TTL cache in
//! front of the DB (§5: "Config store cache: per-process, TTL ≤ 5
//! minutes, invalidated on write via pub-sub or on miss").

use std::time::Duration;

use diesel::prelude::*;
use diesel_async::{AsyncConnection, RunQueryDsl};
use pipeline_utils::TtlCache;

use crate::error::StoreError;
use crate::models::{DocumentClass, InputSource, Model, OutputFormat, PipelineStep};
use crate::pool::Pool;
use crate::schema::{document_classes, feature_flags, models, pipeline_steps, system_settings};
use crate::with_conn;

const CONFIG_CACHE_TTL: Duration = Duration::from_secs(300);

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = pipeline_steps)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
struct PipelineStepRecord {
    id: i32,
    name: String,
    description: String,
    order_in_phase: i32,
    document_class_id: Option<i32>,
    post_branching: bool,
    enabled: bool,
    is_branching_step: bool,
    model_id: i32,
    temperature: f64,
    max_tokens: i32,
    prompt_template: String,
    system_prompt: Option<String>,
    required_context_variables: String,
    stop_on_values: Option<String>,
    allowed_continue_tokens: Option<String>,
    termination_reason: Option<String>,
    termination_message: Option<String>,
    retry_on_failure: bool,
    max_retries: i32,
    input_source: String,
    output_format: String,
    version: i32,
}

impl PipelineStepRecord {
    fn into_domain(self) -> Result<PipelineStep, StoreError> {
        Ok(PipelineStep {
            id: self.id,
            name: self.name,
            description: self.description,
            order_in_phase: self.order_in_phase,
            document_class_id: self.document_class_id,
            post_branching: self.post_branching,
            enabled: self.enabled,
            is_branching_step: self.is_branching_step,
            model_id: self.model_id,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            prompt_template: self.prompt_template,
            system_prompt: self.system_prompt,
            required_context_variables: serde_json::from_str(&self.required_context_variables)
                .map_err(|e| StoreError::Codec(e.to_string()))?,
            stop_on_values: self
                .stop_on_values
                .as_deref()
                .map(serde_json::from_str)
                .transpose()
                .map_err(|e| StoreError::Codec(e.to_string()))?,
            allowed_continue_tokens: self
                .allowed_continue_tokens
                .as_deref()
                .map(serde_json::from_str)
                .transpose()
                .map_err(|e| StoreError::Codec(e.to_string()))?,
            termination_reason: self.termination_reason,
            termination_message: self.termination_message,
            retry_on_failure: self.retry_on_failure,
            max_retries: self.max_retries,
            input_source: match self.input_source.as_str() {
                "previous_step_output" => InputSource::PreviousStepOutput,
                _ => InputSource::OriginalCleanedText,
            },
            output_format: match self.output_format.as_str() {
                "markdown" => OutputFormat::Markdown,
                "json" => OutputFormat::Json,
                _ => OutputFormat::Text,
            },
            version: self.version,
        })
    }
}

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = document_classes)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
struct DocumentClassRecord {
    id: i32,
    class_key: String,
    display_name: String,
    enabled: bool,
}

impl From<DocumentClassRecord> for DocumentClass {
    fn from(r: DocumentClassRecord) -> Self {
        DocumentClass { id: r.id, class_key: r.class_key, display_name: r.display_name, enabled: r.enabled }
    }
}

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = models)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
struct ModelRecord {
    id: i32,
    name: String,
    provider: String,
    input_price_per_million: f64,
    output_price_per_million: f64,
    max_tokens: i32,
    supports_vision: bool,
    supports_streaming: bool,
    active: bool,
}

impl From<ModelRecord> for Model {
    fn from(r: ModelRecord) -> Self {
        Model {
            id: r.id,
            name: r.name,
            provider: r.provider,
            input_price_per_million: r.input_price_per_million,
            output_price_per_million: r.output_price_per_million,
            max_tokens: r.max_tokens,
            supports_vision: r.supports_vision,
            supports_streaming: r.supports_streaming,
            active: r.active,
        }
    }
}

/// Read-through cache over the step/class/model/setting/flag tables.
///
/// Callers that need an enqueue-time snapshot should call
/// [`ConfigRepository::snapshot`] rather than reading through the cache,
/// since the snapshot must be frozen onto the job regardless of later
/// cache invalidation.
pub struct ConfigRepository {
    pool: Pool,
    steps_cache: TtlCache<(), Vec<PipelineStep>>,
    classes_cache: TtlCache<(), Vec<DocumentClass>>,
    models_cache: TtlCache<(), Vec<Model>>,
}

impl ConfigRepository {
    pub fn new(pool: Pool) -> Self {
        Self {
            pool,
            steps_cache: TtlCache::new(CONFIG_CACHE_TTL),
            classes_cache: TtlCache::new(CONFIG_CACHE_TTL),
            models_cache: TtlCache::new(CONFIG_CACHE_TTL),
        }
    }

    pub async fn enabled_steps(&self) -> Result<Vec<PipelineStep>, StoreError> {
        if let Some(cached) = self.steps_cache.get(&()) {
            return Ok(cached);
        }
        let records: Vec<PipelineStepRecord> = with_conn!(self.pool, conn, {
            pipeline_steps::table
                .filter(pipeline_steps::enabled.eq(true))
                .load(&mut conn)
                .await
                .map_err(StoreError::from)
        })?;
        let steps = records
            .into_iter()
            .map(PipelineStepRecord::into_domain)
            .collect::<Result<Vec<_>, _>>()?;
        self.steps_cache.put((), steps.clone());
        Ok(steps)
    }

    pub async fn document_classes(&self) -> Result<Vec<DocumentClass>, StoreError> {
        if let Some(cached) = self.classes_cache.get(&()) {
            return Ok(cached);
        }
        let records: Vec<DocumentClassRecord> = with_conn!(self.pool, conn, {
            document_classes::table.load(&mut conn).await.map_err(StoreError::from)
        })?;
        let classes: Vec<DocumentClass> = records.into_iter().map(DocumentClass::from).collect();
        self.classes_cache.put((), classes.clone());
        Ok(classes)
    }

    pub async fn active_models(&self) -> Result<Vec<Model>, StoreError> {
        if let Some(cached) = self.models_cache.get(&()) {
            return Ok(cached);
        }
        let records: Vec<ModelRecord> = with_conn!(self.pool, conn, {
            models::table.filter(models::active.eq(true)).load(&mut conn).await.map_err(StoreError::from)
        })?;
        let out: Vec<Model> = records.into_iter().map(Model::from).collect();
        self.models_cache.put((), out.clone());
        Ok(out)
    }

    /// Invalidates all cached config reads; callers invoke this after any
    /// write to a config table (§5: "invalidated on write").
    pub fn invalidate(&self) {
        self.steps_cache.invalidate_all();
        self.classes_cache.invalidate_all();
        self.models_cache.invalidate_all();
    }

    /// Builds the JSON snapshot stored on `Job.pipeline_config` at enqueue
    /// time. Bypasses the cache deliberately: the snapshot must reflect
    /// the step set at this exact moment, not a stale cached read.
    pub async fn snapshot(&self) -> Result<serde_json::Value, StoreError> {
        let records: Vec<PipelineStepRecord> = with_conn!(self.pool, conn, {
            pipeline_steps::table
                .filter(pipeline_steps::enabled.eq(true))
                .load(&mut conn)
                .await
                .map_err(StoreError::from)
        })?;
        let steps = records
            .into_iter()
            .map(PipelineStepRecord::into_domain)
            .collect::<Result<Vec<_>, _>>()?;
        serde_json::to_value(&steps).map_err(|e| StoreError::Codec(e.to_string()))
    }

    pub async fn bump_step_version(&self, step_id: i32) -> Result<i32, StoreError> {
        let new_version: i32 = with_conn!(self.pool, conn, {
            diesel::update(pipeline_steps::table.filter(pipeline_steps::id.eq(step_id)))
                .set(pipeline_steps::version.eq(pipeline_steps::version + 1))
                .execute(&mut conn)
                .await?;
            pipeline_steps::table
                .filter(pipeline_steps::id.eq(step_id))
                .select(pipeline_steps::version)
                .first(&mut conn)
                .await
                .map_err(StoreError::from)
        })?;
        self.invalidate();
        Ok(new_version)
    }

    pub async fn get_setting(&self, key: &str) -> Result<Option<String>, StoreError> {
        with_conn!(self.pool, conn, {
            system_settings::table
                .filter(system_settings::key.eq(key))
                .select(system_settings::value)
                .first(&mut conn)
                .await
                .optional()
                .map_err(StoreError::from)
        })
    }

    pub async fn feature_flag(&self, name: &str) -> Result<bool, StoreError> {
        let enabled: Option<bool> = with_conn!(self.pool, conn, {
            feature_flags::table
                .filter(feature_flags::name.eq(name))
                .select(feature_flags::enabled)
                .first(&mut conn)
                .await
                .optional()
                .map_err(StoreError::from)
        })?;
        Ok(enabled.unwrap_or(false))
    }

    /// Inserts a model row if none with this `name` exists yet, returning
    /// its id either way. Used by bootstrap seeding (`pipeline-config`),
    /// never called on the hot path.
    pub async fn ensure_model(&self, new_model: NewModel) -> Result<i32, StoreError> {
        let id: i32 = with_conn!(self.pool, conn, {
            conn.transaction(|conn| {
                let new_model = new_model.clone();
                Box::pin(async move {
                    let existing: Option<i32> = models::table
                        .filter(models::name.eq(&new_model.name))
                        .select(models::id)
                        .first(conn)
                        .await
                        .optional()?;
                    if let Some(id) = existing {
                        return Ok(id);
                    }
                    diesel::insert_into(models::table).values(&new_model).execute(conn).await?;
                    models::table.filter(models::name.eq(&new_model.name)).select(models::id).first(conn).await
                })
            })
            .await
        })?;
        self.invalidate();
        Ok(id)
    }

    /// Inserts a document class row if none with this `class_key` exists
    /// yet, returning its id either way.
    pub async fn ensure_document_class(&self, new_class: NewDocumentClass) -> Result<i32, StoreError> {
        let id: i32 = with_conn!(self.pool, conn, {
            conn.transaction(|conn| {
                let new_class = new_class.clone();
                Box::pin(async move {
                    let existing: Option<i32> = document_classes::table
                        .filter(document_classes::class_key.eq(&new_class.class_key))
                        .select(document_classes::id)
                        .first(conn)
                        .await
                        .optional()?;
                    if let Some(id) = existing {
                        return Ok(id);
                    }
                    diesel::insert_into(document_classes::table).values(&new_class).execute(conn).await?;
                    document_classes::table
                        .filter(document_classes::class_key.eq(&new_class.class_key))
                        .select(document_classes::id)
                        .first(conn)
                        .await
                })
            })
            .await
        })?;
        self.invalidate();
        Ok(id)
    }

    /// Inserts a pipeline step row if none with this `name` exists yet,
    /// returning its id either way.
    pub async fn ensure_step(&self, new_step: NewPipelineStep) -> Result<i32, StoreError> {
        let id: i32 = with_conn!(self.pool, conn, {
            conn.transaction(|conn| {
                let new_step = new_step.clone();
                Box::pin(async move {
                    let existing: Option<i32> = pipeline_steps::table
                        .filter(pipeline_steps::name.eq(&new_step.name))
                        .select(pipeline_steps::id)
                        .first(conn)
                        .await
                        .optional()?;
                    if let Some(id) = existing {
                        return Ok(id);
                    }
                    diesel::insert_into(pipeline_steps::table).values(&new_step).execute(conn).await?;
                    pipeline_steps::table
                        .filter(pipeline_steps::name.eq(&new_step.name))
                        .select(pipeline_steps::id)
                        .first(conn)
                        .await
                })
            })
            .await
        })?;
        self.invalidate();
        Ok(id)
    }

    pub async fn set_setting(&self, key: &str, value: &str, is_encrypted: bool) -> Result<(), StoreError> {
        with_conn!(self.pool, conn, {
            diesel::insert_into(system_settings::table)
                .values((
                    system_settings::key.eq(key),
                    system_settings::value.eq(value),
                    system_settings::is_encrypted.eq(is_encrypted),
                ))
                .on_conflict(system_settings::key)
                .do_update()
                .set((system_settings::value.eq(value), system_settings::is_encrypted.eq(is_encrypted)))
                .execute(&mut conn)
                .await
                .map(|_| ())
                .map_err(StoreError::from)
        })
    }

    pub async fn set_feature_flag(&self, name: &str, enabled: bool) -> Result<(), StoreError> {
        with_conn!(self.pool, conn, {
            diesel::insert_into(feature_flags::table)
                .values((feature_flags::name.eq(name), feature_flags::enabled.eq(enabled)))
                .on_conflict(feature_flags::name)
                .do_update()
                .set(feature_flags::enabled.eq(enabled))
                .execute(&mut conn)
                .await
                .map(|_| ())
                .map_err(StoreError::from)
        })
    }
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = models)]
pub struct NewModel {
    pub name: String,
    pub provider: String,
    pub input_price_per_million: f64,
    pub output_price_per_million: f64,
    pub max_tokens: i32,
    pub supports_vision: bool,
    pub supports_streaming: bool,
    pub active: bool,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = document_classes)]
pub struct NewDocumentClass {
    pub class_key: String,
    pub display_name: String,
    pub enabled: bool,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = pipeline_steps)]
pub struct NewPipelineStep {
    pub name: String,
    pub description: String,
    pub order_in_phase: i32,
    pub document_class_id: Option<i32>,
    pub post_branching: bool,
    pub enabled: bool,
    pub is_branching_step: bool,
    pub model_id: i32,
    pub temperature: f64,
    pub max_tokens: i32,
    pub prompt_template: String,
    pub system_prompt: Option<String>,
    pub required_context_variables: String,
    pub stop_on_values: Option<String>,
    pub allowed_continue_tokens: Option<String>,
    pub termination_reason: Option<String>,
    pub termination_message: Option<String>,
    pub retry_on_failure: bool,
    pub max_retries: i32,
    pub input_source: String,
    pub output_format: String,
    pub version: i32,
}
