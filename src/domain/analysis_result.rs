use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::JobId;

/// The stored outcome of analysing one chunk. Written once, never updated.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult {
    pub job_id: JobId,
    pub chunk_index: u32,
    pub chunk_text: String,
    pub llm_response: String,
    pub tokens_used: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost_usd: Decimal,
    pub processing_time_ms: u64,
    pub created_at: DateTime<Utc>,
}
