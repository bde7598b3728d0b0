use std::sync::Arc;

use tokio::sync::Mutex;

use crate::application::ports::{JobRepository, RepositoryError};
use crate::domain::{AnalysisResult, JobId, JobProgress};

/// Single update path for a running job's counters.
///
/// Concurrent chunk tasks of one batch all go through `record`; the lock is held
/// across the persist call so the ledger always receives counters in the same
/// order they were accumulated.
pub struct ProgressRecorder {
    job_id: JobId,
    job_repository: Arc<dyn JobRepository>,
    progress: Mutex<JobProgress>,
}

impl ProgressRecorder {
    pub fn new(job_id: JobId, job_repository: Arc<dyn JobRepository>, start: JobProgress) -> Self {
        Self {
            job_id,
            job_repository,
            progress: Mutex::new(start),
        }
    }

    /// Persists `result` with the advanced counters. The in-memory counters only
    /// move once the write has committed.
    #[tracing::instrument(
        skip(self, result),
        fields(job_id = %self.job_id.as_uuid(), chunk_index = result.chunk_index)
    )]
    pub async fn record(&self, result: &AnalysisResult) -> Result<JobProgress, RepositoryError> {
        let mut progress = self.progress.lock().await;

        let mut next = *progress;
        next.record_chunk(result.tokens_used, result.cost_usd);

        self.job_repository.append_result(result, &next).await?;
        *progress = next;

        tracing::debug!(
            processed = next.processed_chunks,
            total = next.total_chunks,
            tokens = next.total_tokens_used,
            "Chunk recorded"
        );
        Ok(next)
    }

    pub async fn snapshot(&self) -> JobProgress {
        *self.progress.lock().await
    }
}
