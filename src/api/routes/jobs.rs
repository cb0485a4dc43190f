//! Job handlers.

use super::{AddLinkRequest, parse_job_id};
use crate::api::AppState;
use crate::error::{Error, Result};
use crate::types::{JobDetail, JobSummary};
use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};

/// POST /jobs - Create a job
#[utoipa::path(
    post,
    path = "/jobs",
    tag = "jobs",
    responses(
        (status = 201, description = "Job created", body = JobSummary),
        (status = 503, description = "No free processing slot, or shutting down", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError)
    )
)]
pub async fn create_job(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<JobSummary>)> {
    let summary = state.orchestrator.create_job().await?;
    Ok((StatusCode::CREATED, Json(summary)))
}

/// GET /jobs - List jobs
#[utoipa::path(
    get,
    path = "/jobs",
    tag = "jobs",
    responses(
        (status = 200, description = "All jobs, oldest first", body = Vec<JobSummary>),
        (status = 500, description = "Internal server error", body = crate::error::ApiError)
    )
)]
pub async fn list_jobs(State(state): State<AppState>) -> Result<Json<Vec<JobSummary>>> {
    Ok(Json(state.orchestrator.list_jobs().await?))
}

/// GET /jobs/:id - Get job status and result
#[utoipa::path(
    get,
    path = "/jobs/{id}",
    tag = "jobs",
    params(("id" = String, Path, description = "Job ID (UUID)")),
    responses(
        (status = 200, description = "Job status and result", body = JobDetail),
        (status = 400, description = "Malformed job ID", body = crate::error::ApiError),
        (status = 404, description = "Job not found", body = crate::error::ApiError)
    )
)]
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<JobDetail>> {
    let id = parse_job_id(&id)?;
    Ok(Json(state.orchestrator.get_job(id).await?))
}

/// POST /jobs/:id - Attach a link to a job
///
/// The link that fills the job starts archiving in the background; the
/// response carries the `ready` status without waiting for it.
#[utoipa::path(
    post,
    path = "/jobs/{id}",
    tag = "jobs",
    params(("id" = String, Path, description = "Job ID (UUID)")),
    request_body = AddLinkRequest,
    responses(
        (status = 201, description = "Link attached", body = JobSummary),
        (status = 400, description = "Malformed job ID, body, or URL", body = crate::error::ApiError),
        (status = 404, description = "Job not found", body = crate::error::ApiError),
        (status = 409, description = "Job already holds the maximum number of links", body = crate::error::ApiError)
    )
)]
pub async fn add_link(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: std::result::Result<Json<AddLinkRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<JobSummary>)> {
    let id = parse_job_id(&id)?;
    let Json(request) = payload.map_err(|e| Error::InvalidRequest(e.body_text()))?;

    let summary = state.orchestrator.add_link(id, &request.href).await?;
    Ok((StatusCode::CREATED, Json(summary)))
}
