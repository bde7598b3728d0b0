use crate::domain::{Chunk, DocumentId};
use async_trait::async_trait;

use super::RepositoryError;

/// Read-only access to the chunks another pipeline produced for a document.
#[async_trait]
pub trait ChunkSource: Send + Sync {
    /// All chunks of the document, ordered by index.
    async fn list_chunks(&self, document_id: DocumentId) -> Result<Vec<Chunk>, RepositoryError>;
}
