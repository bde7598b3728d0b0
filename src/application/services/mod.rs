mod analysis_service;
mod analysis_worker;
mod cost_estimator;
mod progress_recorder;
mod retry;

pub use analysis_service::{
    AnalysisError, AnalysisService, CreateJobRequest, JobListPage, JobStatusReport,
    MAX_BATCH_SIZE, MAX_OUTPUT_TOKENS, MAX_PAGE_SIZE, MAX_RESULTS_LIMIT, MAX_TEMPERATURE,
    ResultsPage, RunOptions,
};
pub use analysis_worker::{AnalysisMessage, AnalysisWorker};
pub use cost_estimator::CostEstimator;
pub use progress_recorder::ProgressRecorder;
pub use retry::{RetryPolicy, retry_with_backoff};
