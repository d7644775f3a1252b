//! Manual aggregation triggers, used for backfills and re-runs.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::Router;
use serde::Serialize;

use crate::extractors::parse_date;
use crate::response::{ok, AppError};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/job-metrics/:date", post(run_job_metrics))
        .route("/impressions/:date", post(run_impressions))
}

async fn run_job_metrics(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let date = parse_date(&date)?;
    let summary = state.etl().run_job_metrics(state.store(), date).await?;
    Ok(ok(summary))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImpressionsRunResponse {
    date: chrono::NaiveDate,
    groups: usize,
}

async fn run_impressions(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let date = parse_date(&date)?;
    let groups = state.etl().run_impressions(state.store(), date).await?;
    Ok(ok(ImpressionsRunResponse { date, groups }))
}
