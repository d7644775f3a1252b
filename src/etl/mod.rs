pub mod classify;
pub mod impressions;
pub mod job_metrics;
pub mod metric;
pub mod query;
pub mod row;
pub mod rules;

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::Instrument;

use crate::etl::job_metrics::JobMetricsSummary;
use crate::etl::query::{QueryAdapter, QueryError};
use crate::etl::rules::RuleTable;
use crate::store::{Store, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum EtlError {
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error("persistence error: {0}")]
    Persistence(#[from] StoreError),
}

/// Entry points invoked by the scheduler and the manual run endpoints.
///
/// Runs share nothing but the store; each one writes only records keyed by
/// its own (job, date) or date.
#[derive(Clone)]
pub struct Etl {
    adapter: QueryAdapter,
    rules: Arc<RuleTable>,
}

impl Etl {
    pub fn new(adapter: QueryAdapter, rules: Arc<RuleTable>) -> Self {
        Self { adapter, rules }
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    pub async fn run_job_metrics(
        &self,
        store: &Store,
        date: NaiveDate,
    ) -> Result<JobMetricsSummary, EtlError> {
        let span = tracing::info_span!("job_metrics", run_id = %uuid::Uuid::new_v4(), %date);
        job_metrics::run(&self.adapter, &self.rules, store, date)
            .instrument(span)
            .await
    }

    pub async fn run_impressions(&self, store: &Store, date: NaiveDate) -> Result<usize, EtlError> {
        let span = tracing::info_span!("impressions", run_id = %uuid::Uuid::new_v4(), %date);
        impressions::run(&self.adapter, store, date)
            .instrument(span)
            .await
    }
}
