mod analysis;
pub mod dto;
mod error;
mod health;
mod jobs;

pub use analysis::{
    cancel_handler, estimate_cost_handler, pause_handler, resume_handler, start_analysis_handler,
};
pub use error::{ApiError, ApiResult, ErrorResponse};
pub use health::health_handler;
pub use jobs::{delete_job_handler, job_results_handler, job_status_handler, list_jobs_handler};
