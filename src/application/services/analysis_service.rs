use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::{CostEstimator, ProgressRecorder, RetryPolicy, retry_with_backoff};
use crate::application::ports::{
    ChunkSource, JobFilter, JobRepository, LlmClient, LlmClientError, LlmClientFactory,
    LlmClientSpec, RepositoryError,
};
use crate::domain::{
    AnalysisResult, Chunk, CostEstimate, DocumentId, InvalidTransition, Job, JobCommand,
    JobConfig, JobId, JobStatus, LlmProvider, ModelPricing, PromptTemplate,
};

pub const MAX_BATCH_SIZE: u32 = 50;
pub const MAX_OUTPUT_TOKENS: u32 = 4000;
pub const MAX_TEMPERATURE: f32 = 2.0;
pub const MAX_PAGE_SIZE: u64 = 100;
pub const MAX_RESULTS_LIMIT: u64 = 1000;

const MAX_TRANSITION_ATTEMPTS: usize = 3;

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("job {job_id}: {source}")]
    InvalidStateTransition {
        job_id: Uuid,
        source: InvalidTransition,
    },
    #[error("job {0} is currently processing")]
    JobBusy(Uuid),
    #[error(transparent)]
    Provider(#[from] LlmClientError),
    #[error(transparent)]
    Persistence(#[from] RepositoryError),
}

/// Raw creation input as received from a caller.
#[derive(Debug, Clone)]
pub struct CreateJobRequest {
    pub document_id: DocumentId,
    pub provider: String,
    pub model: String,
    pub llm_config_id: Option<String>,
    pub base_url: Option<String>,
    pub prompt_template: String,
    pub chunk_batch_size: u32,
    pub pause_after_batch: bool,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl CreateJobRequest {
    pub fn into_config(self) -> Result<JobConfig, AnalysisError> {
        let provider = parse_provider(&self.provider)?;

        let model = self.model.trim().to_string();
        if model.is_empty() {
            return Err(AnalysisError::Validation("model must not be empty".into()));
        }

        let prompt_template = PromptTemplate::parse(self.prompt_template)
            .map_err(|e| AnalysisError::Validation(e.to_string()))?;

        if !(1..=MAX_BATCH_SIZE).contains(&self.chunk_batch_size) {
            return Err(AnalysisError::Validation(format!(
                "chunk_batch_size must be between 1 and {MAX_BATCH_SIZE}"
            )));
        }
        validate_max_tokens(self.max_tokens)?;
        validate_temperature(self.temperature)?;

        Ok(JobConfig {
            document_id: self.document_id,
            provider,
            model,
            llm_config_id: self.llm_config_id.filter(|id| !id.trim().is_empty()),
            base_url: self.base_url.filter(|url| !url.trim().is_empty()),
            prompt_template,
            chunk_batch_size: self.chunk_batch_size,
            pause_after_batch: self.pause_after_batch,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        })
    }
}

/// Per-run overrides. Nothing here is persisted.
#[derive(Clone, Default)]
pub struct RunOptions {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl RunOptions {
    fn validate(&self) -> Result<(), AnalysisError> {
        if let Some(max_tokens) = self.max_tokens {
            validate_max_tokens(max_tokens)?;
        }
        if let Some(temperature) = self.temperature {
            validate_temperature(temperature)?;
        }
        Ok(())
    }
}

impl fmt::Debug for RunOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunOptions")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JobStatusReport {
    pub job_id: JobId,
    pub document_id: DocumentId,
    pub status: JobStatus,
    pub provider: LlmProvider,
    pub model: String,
    pub llm_config_id: Option<String>,
    pub chunk_batch_size: u32,
    pub pause_after_batch: bool,
    pub total_chunks: u32,
    pub processed_chunks: u32,
    pub percentage: f64,
    pub total_tokens_used: u64,
    pub total_cost_usd: Decimal,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub paused_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<&Job> for JobStatusReport {
    fn from(job: &Job) -> Self {
        Self {
            job_id: job.id,
            document_id: job.config.document_id,
            status: job.status,
            provider: job.config.provider,
            model: job.config.model.clone(),
            llm_config_id: job.config.llm_config_id.clone(),
            chunk_batch_size: job.config.chunk_batch_size,
            pause_after_batch: job.config.pause_after_batch,
            total_chunks: job.progress.total_chunks,
            processed_chunks: job.progress.processed_chunks,
            percentage: job.progress.percentage(),
            total_tokens_used: job.progress.total_tokens_used,
            total_cost_usd: job.progress.total_cost_usd,
            error_message: job.error_message.clone(),
            created_at: job.created_at,
            started_at: job.started_at,
            paused_at: job.paused_at,
            completed_at: job.completed_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultsPage {
    pub results: Vec<AnalysisResult>,
    pub total: u64,
    pub skip: u64,
    pub limit: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JobListPage {
    pub jobs: Vec<JobStatusReport>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
}

pub struct AnalysisService {
    job_repository: Arc<dyn JobRepository>,
    chunk_source: Arc<dyn ChunkSource>,
    llm_factory: Arc<dyn LlmClientFactory>,
    cost_estimator: CostEstimator,
    retry_policy: RetryPolicy,
}

impl AnalysisService {
    pub fn new(
        job_repository: Arc<dyn JobRepository>,
        chunk_source: Arc<dyn ChunkSource>,
        llm_factory: Arc<dyn LlmClientFactory>,
        retry_policy: RetryPolicy,
    ) -> Self {
        Self {
            job_repository,
            chunk_source,
            llm_factory,
            cost_estimator: CostEstimator::new(),
            retry_policy,
        }
    }

    /// Validates the request and persists a job that is already `processing`.
    /// Execution is a separate `run` call.
    #[tracing::instrument(skip(self, request), fields(document_id = %request.document_id.as_uuid()))]
    pub async fn create_job(&self, request: CreateJobRequest) -> Result<Job, AnalysisError> {
        let config = request.into_config()?;

        let chunks = self.chunk_source.list_chunks(config.document_id).await?;
        if chunks.is_empty() {
            return Err(AnalysisError::NotFound(format!(
                "no chunks for document {}",
                config.document_id.as_uuid()
            )));
        }
        let total_chunks = u32::try_from(chunks.len()).map_err(|_| {
            AnalysisError::Validation(format!("document has too many chunks: {}", chunks.len()))
        })?;

        let mut job = Job::new(config, total_chunks);
        job.apply(JobCommand::Start)
            .map_err(|source| AnalysisError::InvalidStateTransition {
                job_id: job.id.as_uuid(),
                source,
            })?;

        self.job_repository.create(&job).await?;

        tracing::info!(
            job_id = %job.id.as_uuid(),
            provider = %job.config.provider,
            model = %job.config.model,
            total_chunks,
            "Analysis job created"
        );
        Ok(job)
    }

    /// Processes the job's remaining chunks until it completes, pauses after a
    /// batch, or is stopped by an operator. Returns the status the run left it in.
    ///
    /// Any provider or persistence error marks the job `failed` before it is returned.
    #[tracing::instrument(skip(self, options), fields(job_id = %job_id.as_uuid()))]
    pub async fn run(&self, job_id: JobId, options: RunOptions) -> Result<JobStatus, AnalysisError> {
        options.validate()?;

        let job = self.load(job_id).await?;
        if job.status != JobStatus::Processing {
            return Err(AnalysisError::InvalidStateTransition {
                job_id: job_id.as_uuid(),
                source: InvalidTransition {
                    from: job.status,
                    command: JobCommand::Start,
                },
            });
        }

        match self.execute(&job, &options).await {
            Ok(status) => {
                tracing::info!(status = %status, "Analysis run finished");
                Ok(status)
            }
            Err(e) => {
                self.mark_failed(job_id, &e).await;
                Err(e)
            }
        }
    }

    async fn execute(&self, job: &Job, options: &RunOptions) -> Result<JobStatus, AnalysisError> {
        let config = &job.config;

        let client = self.llm_factory.create(&LlmClientSpec {
            provider: config.provider,
            model: config.model.clone(),
            api_key: options.api_key.clone(),
            base_url: options.base_url.clone().or_else(|| config.base_url.clone()),
        })?;

        let chunks = self.chunk_source.list_chunks(config.document_id).await?;
        let done: HashSet<u32> = self
            .job_repository
            .processed_indices(job.id)
            .await?
            .into_iter()
            .collect();
        let pending: Vec<&Chunk> = chunks
            .iter()
            .filter(|chunk| !done.contains(&chunk.index))
            .collect();

        tracing::info!(
            processed = job.progress.processed_chunks,
            total = job.progress.total_chunks,
            pending = pending.len(),
            "Starting analysis run"
        );

        let pricing = self
            .cost_estimator
            .pricing_for(config.provider, &config.model);
        let recorder = ProgressRecorder::new(job.id, Arc::clone(&self.job_repository), job.progress);
        let unit = ChunkAnalysis {
            job_id: job.id,
            template: &config.prompt_template,
            client: client.as_ref(),
            pricing: &pricing,
            recorder: &recorder,
            retry_policy: &self.retry_policy,
            max_tokens: options.max_tokens.unwrap_or(config.max_tokens),
            temperature: options.temperature.unwrap_or(config.temperature),
        };

        let batch_size = config.chunk_batch_size.max(1) as usize;
        let batch_count = pending.len().div_ceil(batch_size);

        for (batch_index, batch) in pending.chunks(batch_size).enumerate() {
            let current = self.load(job.id).await?;
            if current.status != JobStatus::Processing {
                tracing::info!(status = %current.status, "Job left processing, stopping run");
                return Ok(current.status);
            }

            let outcomes = join_all(batch.iter().map(|chunk| unit.analyse(chunk))).await;

            let progress = recorder.snapshot().await;
            tracing::info!(
                batch = batch_index + 1,
                batches = batch_count,
                processed = progress.processed_chunks,
                total = progress.total_chunks,
                percentage = progress.percentage(),
                cost_usd = %progress.total_cost_usd,
                "Batch finished"
            );

            if let Some(e) = outcomes.into_iter().find_map(Result::err) {
                return Err(e);
            }

            let more_remaining = batch_index + 1 < batch_count;
            if config.pause_after_batch && more_remaining {
                return self.finish_run(job.id, JobCommand::Pause).await;
            }
        }

        self.finish_run(job.id, JobCommand::Complete).await
    }

    /// Applies the run's closing transition unless an operator already moved the job.
    async fn finish_run(&self, job_id: JobId, command: JobCommand) -> Result<JobStatus, AnalysisError> {
        let mut job = self.load(job_id).await?;
        if job.status != JobStatus::Processing {
            return Ok(job.status);
        }

        job.apply(command)
            .map_err(|source| AnalysisError::InvalidStateTransition {
                job_id: job_id.as_uuid(),
                source,
            })?;

        if self
            .job_repository
            .update_lifecycle(&job, JobStatus::Processing)
            .await?
        {
            return Ok(job.status);
        }

        Ok(self.load(job_id).await?.status)
    }

    async fn mark_failed(&self, job_id: JobId, error: &AnalysisError) {
        let message = error.to_string();
        match self.try_mark_failed(job_id, &message).await {
            Ok(true) => tracing::error!(error = %message, "Analysis job failed"),
            Ok(false) => tracing::warn!(
                error = %message,
                "Run failed but the job had already left processing"
            ),
            Err(e) => tracing::error!(
                error = %message,
                persist_error = %e,
                "Failed to record job failure"
            ),
        }
    }

    async fn try_mark_failed(&self, job_id: JobId, message: &str) -> Result<bool, RepositoryError> {
        let Some(mut job) = self.job_repository.get_by_id(job_id).await? else {
            return Ok(false);
        };
        if job.fail(message).is_err() {
            return Ok(false);
        }
        self.job_repository
            .update_lifecycle(&job, JobStatus::Processing)
            .await
    }

    #[tracing::instrument(skip(self), fields(job_id = %job_id.as_uuid()))]
    pub async fn pause(&self, job_id: JobId) -> Result<Job, AnalysisError> {
        self.apply_command(job_id, JobCommand::Pause).await
    }

    /// Only flips the status back to `processing`; the caller triggers the next run.
    #[tracing::instrument(skip(self), fields(job_id = %job_id.as_uuid()))]
    pub async fn resume(&self, job_id: JobId) -> Result<Job, AnalysisError> {
        self.apply_command(job_id, JobCommand::Resume).await
    }

    #[tracing::instrument(skip(self), fields(job_id = %job_id.as_uuid()))]
    pub async fn cancel(&self, job_id: JobId) -> Result<Job, AnalysisError> {
        self.apply_command(job_id, JobCommand::Cancel).await
    }

    async fn apply_command(&self, job_id: JobId, command: JobCommand) -> Result<Job, AnalysisError> {
        for _ in 0..MAX_TRANSITION_ATTEMPTS {
            let mut job = self.load(job_id).await?;
            let expected = job.status;

            job.apply(command)
                .map_err(|source| AnalysisError::InvalidStateTransition {
                    job_id: job_id.as_uuid(),
                    source,
                })?;

            if self.job_repository.update_lifecycle(&job, expected).await? {
                tracing::info!(from = %expected, to = %job.status, "Job status transition");
                return Ok(job);
            }
            tracing::debug!(command = %command, "Status changed concurrently, retrying");
        }

        Err(AnalysisError::JobBusy(job_id.as_uuid()))
    }

    pub async fn get_status(&self, job_id: JobId) -> Result<JobStatusReport, AnalysisError> {
        let job = self.load(job_id).await?;
        Ok(JobStatusReport::from(&job))
    }

    pub async fn get_results(
        &self,
        job_id: JobId,
        skip: u64,
        limit: u64,
    ) -> Result<ResultsPage, AnalysisError> {
        if !(1..=MAX_RESULTS_LIMIT).contains(&limit) {
            return Err(AnalysisError::Validation(format!(
                "limit must be between 1 and {MAX_RESULTS_LIMIT}"
            )));
        }
        self.load(job_id).await?;

        let page = self
            .job_repository
            .list_results(job_id, skip, limit)
            .await?;
        Ok(ResultsPage {
            results: page.items,
            total: page.total,
            skip,
            limit,
        })
    }

    pub async fn list_jobs(
        &self,
        filter: JobFilter,
        page: u64,
        page_size: u64,
    ) -> Result<JobListPage, AnalysisError> {
        if page == 0 {
            return Err(AnalysisError::Validation("page starts at 1".into()));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(AnalysisError::Validation(format!(
                "page_size must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }

        let offset = (page - 1).saturating_mul(page_size);
        let listed = self
            .job_repository
            .list(&filter, offset, page_size)
            .await?;
        Ok(JobListPage {
            jobs: listed.items.iter().map(JobStatusReport::from).collect(),
            total: listed.total,
            page,
            page_size,
        })
    }

    #[tracing::instrument(skip(self), fields(job_id = %job_id.as_uuid()))]
    pub async fn delete_job(&self, job_id: JobId) -> Result<(), AnalysisError> {
        let job = self.load(job_id).await?;
        if job.status == JobStatus::Processing {
            return Err(AnalysisError::JobBusy(job_id.as_uuid()));
        }

        if !self.job_repository.delete(job_id).await? {
            return Err(job_not_found(job_id));
        }
        tracing::info!("Analysis job deleted");
        Ok(())
    }

    /// Zero chunks yields a zero estimate with warnings rather than an error.
    #[tracing::instrument(skip(self, prompt_template), fields(document_id = %document_id.as_uuid()))]
    pub async fn estimate_cost(
        &self,
        document_id: DocumentId,
        provider: &str,
        model: &str,
        prompt_template: &str,
        max_tokens: u32,
    ) -> Result<CostEstimate, AnalysisError> {
        let provider = parse_provider(provider)?;
        validate_max_tokens(max_tokens)?;
        let prompt_template = PromptTemplate::parse(prompt_template)
            .map_err(|e| AnalysisError::Validation(e.to_string()))?;

        let chunks = self.chunk_source.list_chunks(document_id).await?;
        Ok(self.cost_estimator.estimate(
            document_id,
            &chunks,
            provider,
            model,
            &prompt_template,
            max_tokens,
        ))
    }

    async fn load(&self, job_id: JobId) -> Result<Job, AnalysisError> {
        self.job_repository
            .get_by_id(job_id)
            .await?
            .ok_or_else(|| job_not_found(job_id))
    }
}

/// Everything one chunk needs for a single run.
struct ChunkAnalysis<'a> {
    job_id: JobId,
    template: &'a PromptTemplate,
    client: &'a dyn LlmClient,
    pricing: &'a ModelPricing,
    recorder: &'a ProgressRecorder,
    retry_policy: &'a RetryPolicy,
    max_tokens: u32,
    temperature: f32,
}

impl ChunkAnalysis<'_> {
    async fn analyse(&self, chunk: &Chunk) -> Result<(), AnalysisError> {
        let prompt = self.template.render(&chunk.text);
        let prompt = prompt.as_str();
        let client = self.client;
        let (max_tokens, temperature) = (self.max_tokens, self.temperature);

        let started = Instant::now();
        let completion = retry_with_backoff(self.retry_policy, move || {
            client.generate(prompt, max_tokens, temperature)
        })
        .await
        .inspect_err(|e| tracing::warn!(chunk_index = chunk.index, error = %e, "Chunk analysis failed"))?;
        let elapsed = started.elapsed();

        let cost = self
            .pricing
            .cost_of(completion.input_tokens, completion.output_tokens);

        let result = AnalysisResult {
            job_id: self.job_id,
            chunk_index: chunk.index,
            chunk_text: chunk.text.clone(),
            llm_response: completion.text,
            tokens_used: completion.tokens_used,
            input_tokens: completion.input_tokens,
            output_tokens: completion.output_tokens,
            cost_usd: cost.total_cost_usd,
            processing_time_ms: elapsed.as_millis() as u64,
            created_at: Utc::now(),
        };

        self.recorder.record(&result).await?;
        Ok(())
    }
}

fn parse_provider(provider: &str) -> Result<LlmProvider, AnalysisError> {
    provider
        .parse()
        .map_err(|e: crate::domain::UnknownProvider| AnalysisError::Validation(e.to_string()))
}

fn validate_max_tokens(max_tokens: u32) -> Result<(), AnalysisError> {
    if (1..=MAX_OUTPUT_TOKENS).contains(&max_tokens) {
        Ok(())
    } else {
        Err(AnalysisError::Validation(format!(
            "max_tokens must be between 1 and {MAX_OUTPUT_TOKENS}"
        )))
    }
}

fn validate_temperature(temperature: f32) -> Result<(), AnalysisError> {
    if (0.0..=MAX_TEMPERATURE).contains(&temperature) {
        Ok(())
    } else {
        Err(AnalysisError::Validation(format!(
            "temperature must be between 0 and {MAX_TEMPERATURE}"
        )))
    }
}

fn job_not_found(job_id: JobId) -> AnalysisError {
    AnalysisError::NotFound(format!("job {}", job_id.as_uuid()))
}
