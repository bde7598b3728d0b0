use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;

use crate::application::ports::{ChunkSource, JobFilter, JobRepository, Page, RepositoryError};
use crate::domain::{AnalysisResult, Chunk, DocumentId, Job, JobId, JobProgress, JobStatus};

const LEDGER_COST_SCALE: u32 = 4;

#[derive(Default)]
struct Ledger {
    jobs: HashMap<JobId, Job>,
    results: HashMap<JobId, Vec<AnalysisResult>>,
}

/// Process-local ledger with the same compare-and-set and uniqueness rules as
/// the Postgres repository.
#[derive(Default)]
pub struct InMemoryJobRepository {
    ledger: Mutex<Ledger>,
}

impl InMemoryJobRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Ledger>, RepositoryError> {
        self.ledger
            .lock()
            .map_err(|_| RepositoryError::ConnectionFailed("ledger lock poisoned".to_string()))
    }
}

fn paginate<T: Clone>(items: &[T], offset: u64, limit: u64) -> Vec<T> {
    let start = usize::try_from(offset).unwrap_or(usize::MAX);
    let take = usize::try_from(limit).unwrap_or(usize::MAX);
    items.iter().skip(start).take(take).cloned().collect()
}

#[async_trait]
impl JobRepository for InMemoryJobRepository {
    async fn create(&self, job: &Job) -> Result<(), RepositoryError> {
        let mut ledger = self.lock()?;
        if ledger.jobs.contains_key(&job.id) {
            return Err(RepositoryError::ConstraintViolation(format!(
                "job {} already exists",
                job.id.as_uuid()
            )));
        }
        let mut stored = job.clone();
        stored.progress.total_cost_usd = stored.progress.total_cost_usd.round_dp(LEDGER_COST_SCALE);
        ledger.jobs.insert(job.id, stored);
        Ok(())
    }

    async fn get_by_id(&self, id: JobId) -> Result<Option<Job>, RepositoryError> {
        Ok(self.lock()?.jobs.get(&id).cloned())
    }

    async fn update_lifecycle(
        &self,
        job: &Job,
        expected: JobStatus,
    ) -> Result<bool, RepositoryError> {
        let mut ledger = self.lock()?;
        let Some(stored) = ledger.jobs.get_mut(&job.id) else {
            return Ok(false);
        };
        if stored.status != expected {
            return Ok(false);
        }

        stored.status = job.status;
        stored.error_message = job.error_message.clone();
        stored.started_at = job.started_at;
        stored.paused_at = job.paused_at;
        stored.completed_at = job.completed_at;
        stored.updated_at = job.updated_at;
        Ok(true)
    }

    async fn append_result(
        &self,
        result: &AnalysisResult,
        progress: &JobProgress,
    ) -> Result<(), RepositoryError> {
        let mut ledger = self.lock()?;
        let Ledger { jobs, results } = &mut *ledger;

        let job = jobs
            .get_mut(&result.job_id)
            .ok_or_else(|| RepositoryError::NotFound(format!("job {}", result.job_id.as_uuid())))?;

        let job_results = results.entry(result.job_id).or_default();
        if job_results
            .iter()
            .any(|r| r.chunk_index == result.chunk_index)
        {
            return Err(RepositoryError::ConstraintViolation(format!(
                "result for chunk {} already exists",
                result.chunk_index
            )));
        }

        job_results.push(result.clone());
        job.progress.processed_chunks = progress.processed_chunks.min(job.progress.total_chunks);
        job.progress.total_tokens_used = progress.total_tokens_used;
        job.progress.total_cost_usd = progress.total_cost_usd.round_dp(LEDGER_COST_SCALE);
        job.updated_at = Utc::now();
        Ok(())
    }

    async fn list(
        &self,
        filter: &JobFilter,
        offset: u64,
        limit: u64,
    ) -> Result<Page<Job>, RepositoryError> {
        let ledger = self.lock()?;
        let mut matching: Vec<&Job> = ledger
            .jobs
            .values()
            .filter(|job| filter.status.is_none_or(|s| job.status == s))
            .filter(|job| {
                filter
                    .document_id
                    .is_none_or(|d| job.config.document_id == d)
            })
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let jobs: Vec<Job> = matching.into_iter().cloned().collect();
        Ok(Page {
            items: paginate(&jobs, offset, limit),
            total: jobs.len() as u64,
        })
    }

    async fn list_results(
        &self,
        id: JobId,
        offset: u64,
        limit: u64,
    ) -> Result<Page<AnalysisResult>, RepositoryError> {
        let ledger = self.lock()?;
        let mut results = ledger.results.get(&id).cloned().unwrap_or_default();
        results.sort_by_key(|r| r.chunk_index);

        Ok(Page {
            items: paginate(&results, offset, limit),
            total: results.len() as u64,
        })
    }

    async fn processed_indices(&self, id: JobId) -> Result<Vec<u32>, RepositoryError> {
        let ledger = self.lock()?;
        let mut indices: Vec<u32> = ledger
            .results
            .get(&id)
            .map(|results| results.iter().map(|r| r.chunk_index).collect())
            .unwrap_or_default();
        indices.sort_unstable();
        Ok(indices)
    }

    async fn delete(&self, id: JobId) -> Result<bool, RepositoryError> {
        let mut ledger = self.lock()?;
        ledger.results.remove(&id);
        Ok(ledger.jobs.remove(&id).is_some())
    }
}

/// Chunk source backed by a map, filled with `insert_document`.
#[derive(Default)]
pub struct InMemoryChunkSource {
    documents: Mutex<HashMap<DocumentId, Vec<Chunk>>>,
}

impl InMemoryChunkSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `texts` as the document's chunks, indexed from zero.
    pub fn insert_document<I, S>(&self, document_id: DocumentId, texts: I) -> Result<(), RepositoryError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let chunks = texts
            .into_iter()
            .enumerate()
            .map(|(i, text)| {
                let index = u32::try_from(i).map_err(|_| {
                    RepositoryError::ConstraintViolation(format!("chunk index out of range: {i}"))
                })?;
                Ok(Chunk::new(document_id, index, text.into()))
            })
            .collect::<Result<Vec<_>, RepositoryError>>()?;

        self.documents
            .lock()
            .map_err(|_| RepositoryError::ConnectionFailed("chunk store lock poisoned".to_string()))?
            .insert(document_id, chunks);
        Ok(())
    }
}

#[async_trait]
impl ChunkSource for InMemoryChunkSource {
    async fn list_chunks(&self, document_id: DocumentId) -> Result<Vec<Chunk>, RepositoryError> {
        let documents = self
            .documents
            .lock()
            .map_err(|_| RepositoryError::ConnectionFailed("chunk store lock poisoned".to_string()))?;
        let mut chunks = documents.get(&document_id).cloned().unwrap_or_default();
        chunks.sort_by_key(|c| c.index);
        Ok(chunks)
    }
}
