use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::{JobStatus, ReportStatusResponse};
use crate::error::AppError;
use crate::jobs::AnalysisRequest;
use crate::AppState;

/// Request body for starting an analysis
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct AnalyzeRequest {
    /// Page to analyze, absolute http(s) URL
    #[serde(default)]
    pub target_url: String,
    /// Search query the page should rank for
    #[serde(default)]
    pub query: String,
}

/// Acknowledgement returned once a job is queued
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct AnalyzeResponse {
    pub job_id: String,
    pub status: JobStatus,
    pub message: String,
}

#[utoipa::path(
    post,
    path = "/analyze",
    tag = "SEO Analysis",
    request_body = AnalyzeRequest,
    responses(
        (status = 202, description = "Analysis job accepted", body = AnalyzeResponse),
        (status = 400, description = "Invalid target URL or empty query"),
        (status = 500, description = "Internal server error")
    )
)]
#[tracing::instrument(skip(state, request), fields(target = %request.target_url, query = %request.query))]
pub async fn analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<(StatusCode, Json<AnalyzeResponse>), AppError> {
    let request = AnalysisRequest::validate(&request.target_url, &request.query)?;
    let job = state.orchestrator.submit(request)?;
    let status = job.status();

    Ok((
        StatusCode::ACCEPTED,
        Json(AnalyzeResponse {
            job_id: job.job_id,
            status,
            message: "Analysis started. Poll /results/{job_id} for the report.".to_string(),
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/results/{job_id}",
    tag = "SEO Analysis",
    params(
        ("job_id" = String, Path, description = "Identifier returned by /analyze")
    ),
    responses(
        (status = 200, description = "Current job status, with the report once complete", body = ReportStatusResponse),
        (status = 404, description = "No job with this identifier")
    )
)]
pub async fn get_results(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<ReportStatusResponse>, AppError> {
    let job = state
        .orchestrator
        .store()
        .get(&job_id)
        .ok_or_else(|| AppError::JobNotFound(job_id.clone()))?;

    Ok(Json(ReportStatusResponse::from(job)))
}
