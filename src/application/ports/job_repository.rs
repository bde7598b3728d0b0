use crate::domain::{AnalysisResult, DocumentId, Job, JobId, JobProgress, JobStatus};
use async_trait::async_trait;

use super::RepositoryError;

/// The job ledger and its append-only result sink.
#[async_trait]
pub trait JobRepository: Send + Sync {
    async fn create(&self, job: &Job) -> Result<(), RepositoryError>;

    async fn get_by_id(&self, id: JobId) -> Result<Option<Job>, RepositoryError>;

    /// Persists the job's status, timestamps and error message, but only if the
    /// stored status still equals `expected`. Returns `false` when it did not.
    async fn update_lifecycle(&self, job: &Job, expected: JobStatus)
    -> Result<bool, RepositoryError>;

    /// Inserts `result` and overwrites the job's counters with `progress` in one commit.
    async fn append_result(
        &self,
        result: &AnalysisResult,
        progress: &JobProgress,
    ) -> Result<(), RepositoryError>;

    async fn list(
        &self,
        filter: &JobFilter,
        offset: u64,
        limit: u64,
    ) -> Result<Page<Job>, RepositoryError>;

    /// Results ordered by chunk index.
    async fn list_results(
        &self,
        id: JobId,
        offset: u64,
        limit: u64,
    ) -> Result<Page<AnalysisResult>, RepositoryError>;

    /// Chunk indices that already have a stored result.
    async fn processed_indices(&self, id: JobId) -> Result<Vec<u32>, RepositoryError>;

    /// Removes the job together with its results. Returns `false` if it did not exist.
    async fn delete(&self, id: JobId) -> Result<bool, RepositoryError>;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobFilter {
    pub status: Option<JobStatus>,
    pub document_id: Option<DocumentId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}
