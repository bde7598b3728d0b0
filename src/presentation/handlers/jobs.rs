use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;

use super::dto::{JobListResponse, JobResponse, ListJobsQuery, ResultsQuery, ResultsResponse};
use super::error::{ApiError, ApiResult, parse_uuid};
use crate::application::ports::JobFilter;
use crate::domain::{DocumentId, JobId, JobStatus};
use crate::presentation::state::AppState;

const DEFAULT_PAGE_SIZE: u64 = 20;
const DEFAULT_RESULTS_LIMIT: u64 = 100;

#[tracing::instrument(skip(state))]
pub async fn list_jobs_handler(
    State(state): State<AppState>,
    Query(query): Query<ListJobsQuery>,
) -> ApiResult<Json<JobListResponse>> {
    let status = query
        .status
        .as_deref()
        .map(str::parse::<JobStatus>)
        .transpose()
        .map_err(ApiError::bad_request)?;

    let filter = JobFilter {
        status,
        document_id: query.document_id.map(DocumentId::from_uuid),
    };

    let page = state
        .analysis_service
        .list_jobs(
            filter,
            query.page.unwrap_or(1),
            query.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        )
        .await?;

    Ok(Json(JobListResponse::from(page)))
}

#[tracing::instrument(skip(state))]
pub async fn job_status_handler(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<JobResponse>> {
    let job_id = JobId::from_uuid(parse_uuid(&job_id, "job ID")?);
    let report = state.analysis_service.get_status(job_id).await?;
    Ok(Json(JobResponse::from(report)))
}

#[tracing::instrument(skip(state))]
pub async fn job_results_handler(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    Query(query): Query<ResultsQuery>,
) -> ApiResult<Json<ResultsResponse>> {
    let uuid = parse_uuid(&job_id, "job ID")?;
    let page = state
        .analysis_service
        .get_results(
            JobId::from_uuid(uuid),
            query.skip.unwrap_or(0),
            query.limit.unwrap_or(DEFAULT_RESULTS_LIMIT),
        )
        .await?;

    Ok(Json(ResultsResponse::new(uuid, page)))
}

#[tracing::instrument(skip(state))]
pub async fn delete_job_handler(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<StatusCode> {
    let job_id = JobId::from_uuid(parse_uuid(&job_id, "job ID")?);
    state.analysis_service.delete_job(job_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
