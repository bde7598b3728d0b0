mod columns;
mod in_memory_repository;
mod pg_chunk_source;
mod pg_job_repository;

pub use in_memory_repository::{InMemoryChunkSource, InMemoryJobRepository};
pub use pg_chunk_source::PgChunkSource;
pub use pg_job_repository::PgJobRepository;
