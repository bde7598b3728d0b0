use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::application::services::{JobListPage, JobStatusReport, ResultsPage};
use crate::domain::{AnalysisResult, CostEstimate};

#[derive(Debug, Deserialize)]
pub struct EstimateRequest {
    pub provider: String,
    pub model: String,
    pub prompt_template: String,
    pub max_tokens: Option<u32>,
}

#[derive(Deserialize)]
pub struct StartAnalysisRequest {
    pub provider: String,
    pub model: String,
    pub prompt_template: String,
    pub llm_config_id: Option<String>,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub chunk_batch_size: Option<u32>,
    #[serde(default)]
    pub pause_after_batch: bool,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

/// Overrides for the resumed run; an empty body keeps the job's settings.
#[derive(Default, Deserialize)]
#[serde(default)]
pub struct ResumeRequest {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ListJobsQuery {
    pub status: Option<String>,
    pub document_id: Option<Uuid>,
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ResultsQuery {
    pub skip: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct ModelPricingResponse {
    pub provider: String,
    pub model: String,
    pub input_price_per_1k: Decimal,
    pub output_price_per_1k: Decimal,
}

#[derive(Debug, Serialize)]
pub struct CostEstimateResponse {
    pub document_id: Uuid,
    pub total_chunks: u64,
    pub estimated_input_tokens: u64,
    pub estimated_output_tokens: u64,
    pub estimated_total_tokens: u64,
    pub input_cost_usd: Decimal,
    pub output_cost_usd: Decimal,
    pub total_cost_usd: Decimal,
    pub cost_per_chunk_usd: Decimal,
    pub model_pricing: ModelPricingResponse,
    pub warnings: Vec<String>,
}

impl From<CostEstimate> for CostEstimateResponse {
    fn from(estimate: CostEstimate) -> Self {
        Self {
            document_id: estimate.document_id.as_uuid(),
            total_chunks: estimate.total_chunks,
            estimated_input_tokens: estimate.estimated_input_tokens,
            estimated_output_tokens: estimate.estimated_output_tokens,
            estimated_total_tokens: estimate.estimated_total_tokens,
            input_cost_usd: estimate.cost_breakdown.input_cost_usd,
            output_cost_usd: estimate.cost_breakdown.output_cost_usd,
            total_cost_usd: estimate.cost_breakdown.total_cost_usd,
            cost_per_chunk_usd: estimate.cost_per_chunk_usd,
            model_pricing: ModelPricingResponse {
                provider: estimate.model_pricing.provider.to_string(),
                model: estimate.model_pricing.model,
                input_price_per_1k: estimate.model_pricing.input_price_per_1k,
                output_price_per_1k: estimate.model_pricing.output_price_per_1k,
            },
            warnings: estimate.warnings,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct JobResponse {
    pub job_id: Uuid,
    pub document_id: Uuid,
    pub status: String,
    pub provider: String,
    pub model: String,
    pub llm_config_id: Option<String>,
    pub chunk_batch_size: u32,
    pub pause_after_batch: bool,
    pub total_chunks: u32,
    pub processed_chunks: u32,
    pub progress_percentage: f64,
    pub total_tokens_used: u64,
    pub total_cost_usd: Decimal,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub paused_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<JobStatusReport> for JobResponse {
    fn from(report: JobStatusReport) -> Self {
        Self {
            job_id: report.job_id.as_uuid(),
            document_id: report.document_id.as_uuid(),
            status: report.status.to_string(),
            provider: report.provider.to_string(),
            model: report.model,
            llm_config_id: report.llm_config_id,
            chunk_batch_size: report.chunk_batch_size,
            pause_after_batch: report.pause_after_batch,
            total_chunks: report.total_chunks,
            processed_chunks: report.processed_chunks,
            progress_percentage: (report.percentage * 100.0).round() / 100.0,
            total_tokens_used: report.total_tokens_used,
            total_cost_usd: report.total_cost_usd,
            error_message: report.error_message,
            created_at: report.created_at,
            started_at: report.started_at,
            paused_at: report.paused_at,
            completed_at: report.completed_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct JobListResponse {
    pub jobs: Vec<JobResponse>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
}

impl From<JobListPage> for JobListResponse {
    fn from(page: JobListPage) -> Self {
        Self {
            jobs: page.jobs.into_iter().map(JobResponse::from).collect(),
            total: page.total,
            page: page.page,
            page_size: page.page_size,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ResultResponse {
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

impl From<AnalysisResult> for ResultResponse {
    fn from(result: AnalysisResult) -> Self {
        Self {
            chunk_index: result.chunk_index,
            chunk_text: result.chunk_text,
            llm_response: result.llm_response,
            tokens_used: result.tokens_used,
            input_tokens: result.input_tokens,
            output_tokens: result.output_tokens,
            cost_usd: result.cost_usd,
            processing_time_ms: result.processing_time_ms,
            created_at: result.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ResultsResponse {
    pub job_id: Uuid,
    pub results: Vec<ResultResponse>,
    pub total: u64,
    pub skip: u64,
    pub limit: u64,
}

impl ResultsResponse {
    pub fn new(job_id: Uuid, page: ResultsPage) -> Self {
        Self {
            job_id,
            results: page.results.into_iter().map(ResultResponse::from).collect(),
            total: page.total,
            skip: page.skip,
            limit: page.limit,
        }
    }
}
