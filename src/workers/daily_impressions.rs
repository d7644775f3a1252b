//! Daily channel impressions (04:05 UTC, previous day).

use chrono::NaiveDate;

use crate::etl::Etl;
use crate::store::Store;

pub async fn run(store: &Store, etl: &Etl, date: NaiveDate) -> Option<usize> {
    tracing::info!(%date, "Daily impressions worker running");

    match etl.run_impressions(store, date).await {
        Ok(groups) => {
            tracing::info!(%date, groups, "Daily impressions worker finished");
            Some(groups)
        }
        Err(e) => {
            tracing::error!(%date, error = %e, "Daily impressions worker failed");
            None
        }
    }
}
