use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::instrument;

use super::columns::to_u32;
use crate::application::ports::{ChunkSource, RepositoryError};
use crate::domain::{Chunk, DocumentId};

/// Reads the chunks the ingestion pipeline stored in `document_chunks`.
pub struct PgChunkSource {
    pool: PgPool,
}

impl PgChunkSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChunkSource for PgChunkSource {
    #[instrument(skip(self), fields(document_id = %document_id.as_uuid()))]
    async fn list_chunks(&self, document_id: DocumentId) -> Result<Vec<Chunk>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT chunk_index, chunk_text
            FROM document_chunks
            WHERE document_id = $1
            ORDER BY chunk_index
            "#,
        )
        .bind(document_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;

        rows.iter()
            .map(|row| {
                let index: i32 = row
                    .try_get("chunk_index")
                    .map_err(|e| RepositoryError::CorruptRow(e.to_string()))?;
                let text: String = row
                    .try_get("chunk_text")
                    .map_err(|e| RepositoryError::CorruptRow(e.to_string()))?;
                Ok(Chunk::new(
                    document_id,
                    to_u32(i64::from(index), "chunk_index")?,
                    text,
                ))
            })
            .collect()
    }
}
