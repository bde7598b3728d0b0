use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chunk_analyst::application::ports::{
    JobFilter, JobRepository, LlmClient, LlmClientError, LlmClientFactory, LlmClientSpec,
    LlmCompletion,
};
use chunk_analyst::domain::{JobCommand, JobStatus, LlmProvider};
use chunk_analyst::infrastructure::persistence::InMemoryJobRepository;

/// Prompts containing this always fail.
pub const FAILURE_MARKER: &str = "FAIL";
/// Prompts containing this panic inside the client.
pub const PANIC_MARKER: &str = "PANIC";
pub const OUTPUT_TOKENS: u64 = 20;

struct CommandHook {
    on_call: usize,
    command: JobCommand,
    repository: Arc<InMemoryJobRepository>,
}

/// Deterministic client: input tokens equal the prompt's character count,
/// output tokens are fixed.
pub struct ScriptedLlmClient {
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
    delay: Option<Duration>,
    hook: Option<CommandHook>,
}

impl ScriptedLlmClient {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
            delay: None,
            hook: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Applies `command` to every processing job when the `on_call`-th call starts,
    /// the way an operator would from another request.
    pub fn with_command_on_call(
        mut self,
        on_call: usize,
        command: JobCommand,
        repository: Arc<InMemoryJobRepository>,
    ) -> Self {
        self.hook = Some(CommandHook {
            on_call,
            command,
            repository,
        });
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn calls_matching(&self, needle: &str) -> usize {
        self.prompts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.contains(needle))
            .count()
    }
}

async fn apply_to_processing_jobs(repository: &InMemoryJobRepository, command: JobCommand) {
    let filter = JobFilter {
        status: Some(JobStatus::Processing),
        document_id: None,
    };
    let page = repository.list(&filter, 0, 100).await.unwrap();
    for mut job in page.items {
        job.apply(command).unwrap();
        assert!(
            repository
                .update_lifecycle(&job, JobStatus::Processing)
                .await
                .unwrap()
        );
    }
}

#[async_trait::async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn generate(
        &self,
        prompt: &str,
        _max_tokens: u32,
        _temperature: f32,
    ) -> Result<LlmCompletion, LlmClientError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.prompts.lock().unwrap().push(prompt.to_string());

        if let Some(hook) = &self.hook {
            if hook.on_call == call {
                apply_to_processing_jobs(&hook.repository, hook.command).await;
            }
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if prompt.contains(PANIC_MARKER) {
            panic!("scripted panic");
        }

        if prompt.contains(FAILURE_MARKER) {
            return Err(LlmClientError::ApiRequestFailed {
                provider: LlmProvider::OpenAi,
                message: "HTTP 500 Internal Server Error: scripted failure".to_string(),
            });
        }

        let input_tokens = prompt.chars().count() as u64;
        Ok(LlmCompletion {
            text: format!("analysis of {input_tokens} chars"),
            tokens_used: input_tokens + OUTPUT_TOKENS,
            input_tokens,
            output_tokens: OUTPUT_TOKENS,
        })
    }
}

/// Hands out the same scripted client and records every spec it was asked for.
pub struct ScriptedLlmFactory {
    client: Arc<ScriptedLlmClient>,
    specs: Mutex<Vec<LlmClientSpec>>,
}

impl ScriptedLlmFactory {
    pub fn new(client: Arc<ScriptedLlmClient>) -> Self {
        Self {
            client,
            specs: Mutex::new(Vec::new()),
        }
    }

    pub fn specs(&self) -> Vec<LlmClientSpec> {
        self.specs.lock().unwrap().clone()
    }
}

impl LlmClientFactory for ScriptedLlmFactory {
    fn create(&self, spec: &LlmClientSpec) -> Result<Arc<dyn LlmClient>, LlmClientError> {
        self.specs.lock().unwrap().push(spec.clone());
        Ok(self.client.clone())
    }
}
