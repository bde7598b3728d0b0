use uuid::Uuid;

/// A slice of a document's extracted text, addressed by its zero-based index.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub document_id: DocumentId,
    pub index: u32,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentId(Uuid);

impl DocumentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl Chunk {
    pub fn new(document_id: DocumentId, index: u32, text: String) -> Self {
        Self {
            document_id,
            index,
            text,
        }
    }

    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}
