use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;

use crate::extractors::{parse_date, parse_job_id, JsonBody};
use crate::response::{ok, AppError};
use crate::state::AppState;
use crate::store::operations::jobs::TrackedJob;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:job_id", get(get_job).put(put_job))
        .route("/:job_id/daily/:date", get(get_daily_performance))
        .route("/:job_id/totals", get(get_totals))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PutJobRequest {
    template: String,
    #[serde(default)]
    name: Option<String>,
}

async fn put_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    JsonBody(req): JsonBody<PutJobRequest>,
) -> Result<impl IntoResponse, AppError> {
    let job = TrackedJob {
        id: parse_job_id(&job_id)?,
        template: TrackedJob::normalize_template(&req.template),
        name: req.name,
        updated_at: Utc::now(),
    };
    state.store().upsert_tracked_job(&job)?;
    tracing::info!(job_id = job.id, template = %job.template, "Tracked job registered");
    Ok(ok(job))
}

async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let job_id = parse_job_id(&job_id)?;
    let job = state
        .store()
        .get_tracked_job(job_id)?
        .ok_or_else(|| AppError::not_found(&format!("job {job_id} is not tracked")))?;
    Ok(ok(job))
}

async fn get_daily_performance(
    State(state): State<AppState>,
    Path((job_id, date)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let job_id = parse_job_id(&job_id)?;
    let date = parse_date(&date)?;
    let record = state
        .store()
        .get_job_daily_performance(job_id, date)?
        .ok_or_else(|| {
            AppError::not_found(&format!("no performance for job {job_id} on {date}"))
        })?;
    Ok(ok(record))
}

async fn get_totals(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let job_id = parse_job_id(&job_id)?;
    Ok(ok(state.store().job_totals(job_id)?))
}
