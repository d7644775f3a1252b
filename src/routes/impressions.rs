use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;

use crate::extractors::parse_date;
use crate::response::{ok, AppError};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/:date", get(get_daily_impressions))
}

async fn get_daily_impressions(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let date = parse_date(&date)?;
    let record = state
        .store()
        .get_daily_impressions(date)?
        .ok_or_else(|| AppError::not_found(&format!("no impressions for {date}")))?;
    Ok(ok(record))
}
