mod chunk_source;
mod job_repository;
mod llm_client;
mod repository_error;

pub use chunk_source::ChunkSource;
pub use job_repository::{JobFilter, JobRepository, Page};
pub use llm_client::{LlmClient, LlmClientError, LlmClientFactory, LlmClientSpec, LlmCompletion};
pub use repository_error::RepositoryError;
