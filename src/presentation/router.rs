use axum::Router;
use axum::middleware;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::infrastructure::observability::request_id_middleware;
use crate::presentation::handlers::{
    cancel_handler, delete_job_handler, estimate_cost_handler, health_handler,
    job_results_handler, job_status_handler, list_jobs_handler, pause_handler, resume_handler,
    start_analysis_handler,
};
use crate::presentation::state::AppState;

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    let analysis_routes = Router::new()
        .route(
            "/documents/{document_id}/analysis",
            post(start_analysis_handler),
        )
        .route(
            "/documents/{document_id}/analysis/estimate",
            post(estimate_cost_handler),
        )
        .route("/analysis/jobs", get(list_jobs_handler))
        .route(
            "/analysis/jobs/{job_id}",
            get(job_status_handler).delete(delete_job_handler),
        )
        .route("/analysis/jobs/{job_id}/results", get(job_results_handler))
        .route("/analysis/jobs/{job_id}/pause", post(pause_handler))
        .route("/analysis/jobs/{job_id}/resume", post(resume_handler))
        .route("/analysis/jobs/{job_id}/cancel", post(cancel_handler));

    Router::new()
        .route("/health", get(health_handler))
        .nest("/api/v1", analysis_routes)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(trace_layer)
        .layer(cors)
        .with_state(state)
}
