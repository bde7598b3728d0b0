mod pg_pool;
mod repositories;

pub use repositories::InMemoryChunkSource;
pub use repositories::InMemoryJobRepository;
pub use repositories::PgChunkSource;
pub use repositories::PgJobRepository;

pub use pg_pool::{create_pool, run_migrations};
