mod scripted_llm;

use std::sync::Arc;
use std::time::Duration;

use chunk_analyst::application::services::{AnalysisService, CreateJobRequest, RetryPolicy};
use chunk_analyst::domain::DocumentId;
use chunk_analyst::infrastructure::persistence::{InMemoryChunkSource, InMemoryJobRepository};

pub use scripted_llm::{FAILURE_MARKER, OUTPUT_TOKENS, PANIC_MARKER, ScriptedLlmClient, ScriptedLlmFactory};

pub const TEST_TEMPLATE: &str = "Summarize: {chunk_text}";

pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_retries: 3,
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
    }
}

pub fn chunk_texts(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("chunk number {i}")).collect()
}

pub fn create_request(
    document_id: DocumentId,
    chunk_batch_size: u32,
    pause_after_batch: bool,
) -> CreateJobRequest {
    CreateJobRequest {
        document_id,
        provider: "openai".to_string(),
        model: "gpt-3.5-turbo".to_string(),
        llm_config_id: None,
        base_url: None,
        prompt_template: TEST_TEMPLATE.to_string(),
        chunk_batch_size,
        pause_after_batch,
        max_tokens: 500,
        temperature: 0.7,
    }
}

/// Service wired to in-memory adapters and a scripted LLM.
pub struct TestHarness {
    pub service: Arc<AnalysisService>,
    pub repository: Arc<InMemoryJobRepository>,
    pub chunks: Arc<InMemoryChunkSource>,
    pub llm: Arc<ScriptedLlmClient>,
    pub factory: Arc<ScriptedLlmFactory>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::build(|_| ScriptedLlmClient::new())
    }

    /// `make_client` receives the ledger so hooks can act on it mid-run.
    pub fn build(make_client: impl FnOnce(Arc<InMemoryJobRepository>) -> ScriptedLlmClient) -> Self {
        let repository = Arc::new(InMemoryJobRepository::new());
        let chunks = Arc::new(InMemoryChunkSource::new());
        let llm = Arc::new(make_client(Arc::clone(&repository)));
        let factory = Arc::new(ScriptedLlmFactory::new(Arc::clone(&llm)));

        let service = Arc::new(AnalysisService::new(
            repository.clone(),
            chunks.clone(),
            factory.clone(),
            fast_retry(),
        ));

        Self {
            service,
            repository,
            chunks,
            llm,
            factory,
        }
    }

    pub fn document<S: Into<String>>(&self, texts: impl IntoIterator<Item = S>) -> DocumentId {
        let document_id = DocumentId::new();
        self.chunks
            .insert_document(document_id, texts)
            .expect("Failed to insert chunks");
        document_id
    }
}
