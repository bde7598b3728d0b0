mod analysis_result;
mod chunk;
mod cost;
mod job;
mod job_status;
mod llm_provider;
mod prompt_template;

pub use analysis_result::AnalysisResult;
pub use chunk::{Chunk, DocumentId};
pub use cost::{CostBreakdown, CostEstimate, ModelPricing};
pub use job::{Job, JobConfig, JobId, JobProgress};
pub use job_status::{InvalidTransition, JobCommand, JobStatus};
pub use llm_provider::{LlmProvider, UnknownProvider};
pub use prompt_template::{CHUNK_TEXT_PLACEHOLDER, PromptTemplate, PromptTemplateError};
