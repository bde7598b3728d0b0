use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use super::{DocumentId, InvalidTransition, JobCommand, JobStatus, LlmProvider, PromptTemplate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobId(Uuid);

impl JobId {
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

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

/// What a job was asked to do. Fixed once the job is created.
#[derive(Debug, Clone, PartialEq)]
pub struct JobConfig {
    pub document_id: DocumentId,
    pub provider: LlmProvider,
    pub model: String,
    pub llm_config_id: Option<String>,
    pub base_url: Option<String>,
    pub prompt_template: PromptTemplate,
    pub chunk_batch_size: u32,
    pub pause_after_batch: bool,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Counters and spend accumulated while chunks are processed.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct JobProgress {
    pub total_chunks: u32,
    pub processed_chunks: u32,
    pub total_tokens_used: u64,
    pub total_cost_usd: Decimal,
}

impl JobProgress {
    pub fn new(total_chunks: u32) -> Self {
        Self {
            total_chunks,
            ..Self::default()
        }
    }

    /// Accounts for one successfully analysed chunk.
    ///
    /// `processed_chunks` never passes `total_chunks` and cost never decreases.
    pub fn record_chunk(&mut self, tokens_used: u64, cost_usd: Decimal) {
        self.processed_chunks = self
            .processed_chunks
            .saturating_add(1)
            .min(self.total_chunks);
        self.total_tokens_used = self.total_tokens_used.saturating_add(tokens_used);
        self.total_cost_usd += cost_usd.max(Decimal::ZERO);
    }

    pub fn percentage(&self) -> f64 {
        if self.total_chunks == 0 {
            return 0.0;
        }
        f64::from(self.processed_chunks) / f64::from(self.total_chunks) * 100.0
    }
}

#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub config: JobConfig,
    pub status: JobStatus,
    pub progress: JobProgress,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub paused_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn new(config: JobConfig, total_chunks: u32) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            config,
            status: JobStatus::Pending,
            progress: JobProgress::new(total_chunks),
            error_message: None,
            created_at: now,
            started_at: None,
            paused_at: None,
            completed_at: None,
            updated_at: now,
        }
    }

    /// Moves the job through the transition table and stamps the matching timestamp.
    pub fn apply(&mut self, command: JobCommand) -> Result<(), InvalidTransition> {
        let next = self.status.apply(command)?;
        let now = Utc::now();

        match command {
            JobCommand::Start => self.started_at = Some(now),
            JobCommand::Pause => self.paused_at = Some(now),
            JobCommand::Resume => self.paused_at = None,
            JobCommand::Cancel | JobCommand::Complete | JobCommand::Fail => {}
        }
        if next.is_terminal() {
            self.completed_at = Some(now);
        }

        self.status = next;
        self.updated_at = now;
        Ok(())
    }

    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), InvalidTransition> {
        self.apply(JobCommand::Fail)?;
        self.error_message = Some(message.into());
        Ok(())
    }
}
