use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use super::dto::{
    CostEstimateResponse, EstimateRequest, JobResponse, ResumeRequest, StartAnalysisRequest,
};
use super::error::{ApiError, ApiResult, parse_uuid};
use crate::application::services::{
    AnalysisMessage, CreateJobRequest, JobStatusReport, RunOptions,
};
use crate::domain::{DocumentId, JobId};
use crate::presentation::state::AppState;

#[tracing::instrument(skip(state, request))]
pub async fn estimate_cost_handler(
    State(state): State<AppState>,
    Path(document_id): Path<String>,
    Json(request): Json<EstimateRequest>,
) -> ApiResult<Json<CostEstimateResponse>> {
    let document_id = DocumentId::from_uuid(parse_uuid(&document_id, "document ID")?);
    let max_tokens = request
        .max_tokens
        .unwrap_or(state.analysis_defaults.default_max_tokens);

    let estimate = state
        .analysis_service
        .estimate_cost(
            document_id,
            &request.provider,
            &request.model,
            &request.prompt_template,
            max_tokens,
        )
        .await?;

    Ok(Json(CostEstimateResponse::from(estimate)))
}

/// Creates the job and hands its first run to the worker.
#[tracing::instrument(skip(state, request))]
pub async fn start_analysis_handler(
    State(state): State<AppState>,
    Path(document_id): Path<String>,
    Json(request): Json<StartAnalysisRequest>,
) -> ApiResult<impl IntoResponse> {
    let document_id = DocumentId::from_uuid(parse_uuid(&document_id, "document ID")?);
    let defaults = &state.analysis_defaults;

    let options = RunOptions {
        api_key: request.api_key,
        ..RunOptions::default()
    };

    let job = state
        .analysis_service
        .create_job(CreateJobRequest {
            document_id,
            provider: request.provider,
            model: request.model,
            llm_config_id: request.llm_config_id,
            base_url: request.base_url,
            prompt_template: request.prompt_template,
            chunk_batch_size: request
                .chunk_batch_size
                .unwrap_or(defaults.default_batch_size),
            pause_after_batch: request.pause_after_batch,
            max_tokens: request.max_tokens.unwrap_or(defaults.default_max_tokens),
            temperature: request
                .temperature
                .unwrap_or(defaults.default_temperature),
        })
        .await?;

    enqueue_or_pause(&state, job.id, options).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(JobResponse::from(JobStatusReport::from(&job))),
    ))
}

#[tracing::instrument(skip(state))]
pub async fn pause_handler(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<JobResponse>> {
    let job_id = JobId::from_uuid(parse_uuid(&job_id, "job ID")?);
    let job = state.analysis_service.pause(job_id).await?;
    Ok(Json(JobResponse::from(JobStatusReport::from(&job))))
}

/// Flips the job back to processing and queues a run that continues after the
/// last stored chunk.
#[tracing::instrument(skip(state, request))]
pub async fn resume_handler(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    request: Option<Json<ResumeRequest>>,
) -> ApiResult<impl IntoResponse> {
    let job_id = JobId::from_uuid(parse_uuid(&job_id, "job ID")?);
    let Json(request) = request.unwrap_or_default();

    let job = state.analysis_service.resume(job_id).await?;

    enqueue_or_pause(
        &state,
        job.id,
        RunOptions {
            api_key: request.api_key,
            base_url: request.base_url,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        },
    )
    .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(JobResponse::from(JobStatusReport::from(&job))),
    ))
}

#[tracing::instrument(skip(state))]
pub async fn cancel_handler(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<JobResponse>> {
    let job_id = JobId::from_uuid(parse_uuid(&job_id, "job ID")?);
    let job = state.analysis_service.cancel(job_id).await?;
    Ok(Json(JobResponse::from(JobStatusReport::from(&job))))
}

/// A processing job nobody will run can only be cancelled, so a job whose run
/// could not be queued is parked as paused and can be resumed later.
async fn enqueue_or_pause(state: &AppState, job_id: JobId, options: RunOptions) -> ApiResult<()> {
    let Err(e) = enqueue(state, job_id, options).await else {
        return Ok(());
    };

    if let Err(pause_err) = state.analysis_service.pause(job_id).await {
        tracing::error!(
            job_id = %job_id.as_uuid(),
            error = %pause_err,
            "Failed to park job after enqueue failure"
        );
    }
    Err(e)
}

async fn enqueue(state: &AppState, job_id: JobId, options: RunOptions) -> ApiResult<()> {
    state
        .analysis_sender
        .send(AnalysisMessage { job_id, options })
        .await
        .map_err(|e| {
            tracing::error!(job_id = %job_id.as_uuid(), error = %e, "Failed to enqueue analysis run");
            ApiError::service_unavailable("Analysis worker unavailable")
        })
}
