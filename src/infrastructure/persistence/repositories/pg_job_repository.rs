use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use super::columns::{to_i32, to_i64, to_u32, to_u64};
use crate::application::ports::{JobFilter, JobRepository, Page, RepositoryError};
use crate::domain::{
    AnalysisResult, DocumentId, Job, JobConfig, JobId, JobProgress, JobStatus, LlmProvider,
    PromptTemplate,
};

/// Scale of `analysis_jobs.total_cost_usd`.
const LEDGER_COST_SCALE: u32 = 4;

const JOB_COLUMNS: &str = r#"
    id, document_id, provider, model, llm_config_id, base_url, prompt_template,
    chunk_batch_size, pause_after_batch, max_tokens, temperature, status,
    total_chunks, processed_chunks, total_tokens_used, total_cost_usd, error_message,
    created_at, started_at, paused_at, completed_at, updated_at
"#;

const RESULT_COLUMNS: &str = r#"
    job_id, chunk_index, chunk_text, llm_response, tokens_used, input_tokens,
    output_tokens, cost_usd, processing_time_ms, created_at
"#;

pub struct PgJobRepository {
    pool: PgPool,
}

impl PgJobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn query_failed(e: sqlx::Error) -> RepositoryError {
    match e.as_database_error() {
        Some(db) if db.is_unique_violation() || db.is_check_violation() => {
            RepositoryError::ConstraintViolation(db.message().to_string())
        }
        _ => RepositoryError::QueryFailed(e.to_string()),
    }
}

fn corrupt(e: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::CorruptRow(e.to_string())
}

fn job_from_row(row: &PgRow) -> Result<Job, RepositoryError> {
    let provider = row
        .try_get::<String, _>("provider")
        .map_err(corrupt)?
        .parse::<LlmProvider>()
        .map_err(corrupt)?;
    let prompt_template =
        PromptTemplate::parse(row.try_get::<String, _>("prompt_template").map_err(corrupt)?)
            .map_err(corrupt)?;
    let status = row
        .try_get::<String, _>("status")
        .map_err(corrupt)?
        .parse::<JobStatus>()
        .map_err(RepositoryError::CorruptRow)?;

    let config = JobConfig {
        document_id: DocumentId::from_uuid(row.try_get("document_id").map_err(corrupt)?),
        provider,
        model: row.try_get("model").map_err(corrupt)?,
        llm_config_id: row.try_get("llm_config_id").map_err(corrupt)?,
        base_url: row.try_get("base_url").map_err(corrupt)?,
        prompt_template,
        chunk_batch_size: to_u32(
            i64::from(row.try_get::<i32, _>("chunk_batch_size").map_err(corrupt)?),
            "chunk_batch_size",
        )?,
        pause_after_batch: row.try_get("pause_after_batch").map_err(corrupt)?,
        max_tokens: to_u32(
            i64::from(row.try_get::<i32, _>("max_tokens").map_err(corrupt)?),
            "max_tokens",
        )?,
        temperature: row.try_get("temperature").map_err(corrupt)?,
    };

    let progress = JobProgress {
        total_chunks: to_u32(row.try_get("total_chunks").map_err(corrupt)?, "total_chunks")?,
        processed_chunks: to_u32(
            row.try_get("processed_chunks").map_err(corrupt)?,
            "processed_chunks",
        )?,
        total_tokens_used: to_u64(
            row.try_get("total_tokens_used").map_err(corrupt)?,
            "total_tokens_used",
        )?,
        total_cost_usd: row.try_get("total_cost_usd").map_err(corrupt)?,
    };

    Ok(Job {
        id: JobId::from_uuid(row.try_get("id").map_err(corrupt)?),
        config,
        status,
        progress,
        error_message: row.try_get("error_message").map_err(corrupt)?,
        created_at: row.try_get("created_at").map_err(corrupt)?,
        started_at: row.try_get("started_at").map_err(corrupt)?,
        paused_at: row.try_get("paused_at").map_err(corrupt)?,
        completed_at: row.try_get("completed_at").map_err(corrupt)?,
        updated_at: row.try_get("updated_at").map_err(corrupt)?,
    })
}

fn result_from_row(row: &PgRow) -> Result<AnalysisResult, RepositoryError> {
    Ok(AnalysisResult {
        job_id: JobId::from_uuid(row.try_get("job_id").map_err(corrupt)?),
        chunk_index: to_u32(
            i64::from(row.try_get::<i32, _>("chunk_index").map_err(corrupt)?),
            "chunk_index",
        )?,
        chunk_text: row.try_get("chunk_text").map_err(corrupt)?,
        llm_response: row.try_get("llm_response").map_err(corrupt)?,
        tokens_used: to_u64(row.try_get("tokens_used").map_err(corrupt)?, "tokens_used")?,
        input_tokens: to_u64(row.try_get("input_tokens").map_err(corrupt)?, "input_tokens")?,
        output_tokens: to_u64(row.try_get("output_tokens").map_err(corrupt)?, "output_tokens")?,
        cost_usd: row.try_get("cost_usd").map_err(corrupt)?,
        processing_time_ms: to_u64(
            row.try_get("processing_time_ms").map_err(corrupt)?,
            "processing_time_ms",
        )?,
        created_at: row.try_get("created_at").map_err(corrupt)?,
    })
}

#[async_trait]
impl JobRepository for PgJobRepository {
    #[instrument(skip(self, job), fields(job_id = %job.id.as_uuid()))]
    async fn create(&self, job: &Job) -> Result<(), RepositoryError> {
        let config = &job.config;

        sqlx::query(
            r#"
            INSERT INTO analysis_jobs (
                id, document_id, provider, model, llm_config_id, base_url, prompt_template,
                chunk_batch_size, pause_after_batch, max_tokens, temperature, status,
                total_chunks, processed_chunks, total_tokens_used, total_cost_usd, error_message,
                created_at, started_at, paused_at, completed_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12,
                    $13, $14, $15, $16, $17, $18, $19, $20, $21, $22)
            "#,
        )
        .bind(job.id.as_uuid())
        .bind(config.document_id.as_uuid())
        .bind(config.provider.as_str())
        .bind(&config.model)
        .bind(&config.llm_config_id)
        .bind(&config.base_url)
        .bind(config.prompt_template.as_str())
        .bind(to_i32(config.chunk_batch_size, "chunk_batch_size")?)
        .bind(config.pause_after_batch)
        .bind(to_i32(config.max_tokens, "max_tokens")?)
        .bind(config.temperature)
        .bind(job.status.as_str())
        .bind(i64::from(job.progress.total_chunks))
        .bind(i64::from(job.progress.processed_chunks))
        .bind(to_i64(job.progress.total_tokens_used, "total_tokens_used")?)
        .bind(job.progress.total_cost_usd.round_dp(LEDGER_COST_SCALE))
        .bind(&job.error_message)
        .bind(job.created_at)
        .bind(job.started_at)
        .bind(job.paused_at)
        .bind(job.completed_at)
        .bind(job.updated_at)
        .execute(&self.pool)
        .await
        .map_err(query_failed)?;

        Ok(())
    }

    #[instrument(skip(self), fields(job_id = %id.as_uuid()))]
    async fn get_by_id(&self, id: JobId) -> Result<Option<Job>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {JOB_COLUMNS} FROM analysis_jobs WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(query_failed)?;

        row.as_ref().map(job_from_row).transpose()
    }

    #[instrument(skip(self, job), fields(job_id = %job.id.as_uuid(), status = %job.status, expected = %expected))]
    async fn update_lifecycle(
        &self,
        job: &Job,
        expected: JobStatus,
    ) -> Result<bool, RepositoryError> {
        let updated = sqlx::query(
            r#"
            UPDATE analysis_jobs
            SET status = $1, error_message = $2, started_at = $3, paused_at = $4,
                completed_at = $5, updated_at = $6
            WHERE id = $7 AND status = $8
            "#,
        )
        .bind(job.status.as_str())
        .bind(&job.error_message)
        .bind(job.started_at)
        .bind(job.paused_at)
        .bind(job.completed_at)
        .bind(job.updated_at)
        .bind(job.id.as_uuid())
        .bind(expected.as_str())
        .execute(&self.pool)
        .await
        .map_err(query_failed)?;

        Ok(updated.rows_affected() == 1)
    }

    #[instrument(skip(self, result, progress), fields(job_id = %result.job_id.as_uuid(), chunk_index = result.chunk_index))]
    async fn append_result(
        &self,
        result: &AnalysisResult,
        progress: &JobProgress,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(query_failed)?;

        sqlx::query(
            r#"
            INSERT INTO analysis_results (
                job_id, chunk_index, chunk_text, llm_response, tokens_used, input_tokens,
                output_tokens, cost_usd, processing_time_ms, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(result.job_id.as_uuid())
        .bind(to_i32(result.chunk_index, "chunk_index")?)
        .bind(&result.chunk_text)
        .bind(&result.llm_response)
        .bind(to_i64(result.tokens_used, "tokens_used")?)
        .bind(to_i64(result.input_tokens, "input_tokens")?)
        .bind(to_i64(result.output_tokens, "output_tokens")?)
        .bind(result.cost_usd)
        .bind(to_i64(result.processing_time_ms, "processing_time_ms")?)
        .bind(result.created_at)
        .execute(&mut *tx)
        .await
        .map_err(query_failed)?;

        let updated = sqlx::query(
            r#"
            UPDATE analysis_jobs
            SET processed_chunks = LEAST($1, total_chunks),
                total_tokens_used = $2,
                total_cost_usd = $3,
                updated_at = $4
            WHERE id = $5
            "#,
        )
        .bind(i64::from(progress.processed_chunks))
        .bind(to_i64(progress.total_tokens_used, "total_tokens_used")?)
        .bind(progress.total_cost_usd.round_dp(LEDGER_COST_SCALE))
        .bind(Utc::now())
        .bind(result.job_id.as_uuid())
        .execute(&mut *tx)
        .await
        .map_err(query_failed)?;

        if updated.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!(
                "job {}",
                result.job_id.as_uuid()
            )));
        }

        tx.commit().await.map_err(query_failed)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list(
        &self,
        filter: &JobFilter,
        offset: u64,
        limit: u64,
    ) -> Result<Page<Job>, RepositoryError> {
        let status = filter.status.map(|s| s.as_str());
        let document_id: Option<Uuid> = filter.document_id.map(|id| id.as_uuid());

        let rows = sqlx::query(&format!(
            r#"
            SELECT {JOB_COLUMNS} FROM analysis_jobs
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::uuid IS NULL OR document_id = $2)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(status)
        .bind(document_id)
        .bind(to_i64(limit, "limit")?)
        .bind(to_i64(offset, "offset")?)
        .fetch_all(&self.pool)
        .await
        .map_err(query_failed)?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM analysis_jobs
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::uuid IS NULL OR document_id = $2)
            "#,
        )
        .bind(status)
        .bind(document_id)
        .fetch_one(&self.pool)
        .await
        .map_err(query_failed)?;

        Ok(Page {
            items: rows.iter().map(job_from_row).collect::<Result<_, _>>()?,
            total: to_u64(total, "count")?,
        })
    }

    #[instrument(skip(self), fields(job_id = %id.as_uuid()))]
    async fn list_results(
        &self,
        id: JobId,
        offset: u64,
        limit: u64,
    ) -> Result<Page<AnalysisResult>, RepositoryError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {RESULT_COLUMNS} FROM analysis_results
            WHERE job_id = $1
            ORDER BY chunk_index
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(id.as_uuid())
        .bind(to_i64(limit, "limit")?)
        .bind(to_i64(offset, "offset")?)
        .fetch_all(&self.pool)
        .await
        .map_err(query_failed)?;

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM analysis_results WHERE job_id = $1")
                .bind(id.as_uuid())
                .fetch_one(&self.pool)
                .await
                .map_err(query_failed)?;

        Ok(Page {
            items: rows.iter().map(result_from_row).collect::<Result<_, _>>()?,
            total: to_u64(total, "count")?,
        })
    }

    #[instrument(skip(self), fields(job_id = %id.as_uuid()))]
    async fn processed_indices(&self, id: JobId) -> Result<Vec<u32>, RepositoryError> {
        let indices: Vec<i32> = sqlx::query_scalar(
            "SELECT chunk_index FROM analysis_results WHERE job_id = $1 ORDER BY chunk_index",
        )
        .bind(id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(query_failed)?;

        indices
            .into_iter()
            .map(|i| to_u32(i64::from(i), "chunk_index"))
            .collect()
    }

    #[instrument(skip(self), fields(job_id = %id.as_uuid()))]
    async fn delete(&self, id: JobId) -> Result<bool, RepositoryError> {
        let deleted = sqlx::query("DELETE FROM analysis_jobs WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(query_failed)?;

        Ok(deleted.rows_affected() > 0)
    }
}
