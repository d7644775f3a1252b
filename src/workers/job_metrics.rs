//! Job metrics aggregation: hourly for the current UTC day, daily for yesterday.

use chrono::NaiveDate;

use crate::etl::Etl;
use crate::store::Store;

pub async fn run(store: &Store, etl: &Etl, date: NaiveDate) -> bool {
    tracing::info!(%date, "Job metrics worker running");

    match etl.run_job_metrics(store, date).await {
        Ok(summary) => {
            tracing::info!(
                %date,
                jobs = summary.jobs_written,
                orphans = summary.orphan_rows,
                "Job metrics worker finished"
            );
            true
        }
        Err(e) => {
            tracing::error!(%date, error = %e, "Job metrics worker failed");
            false
        }
    }
}
