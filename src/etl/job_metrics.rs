//! Per-job daily performance aggregation.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;

use crate::etl::classify::{classify, Contribution, DetailKey};
use crate::etl::query::{QueryAdapter, Report};
use crate::etl::row::EventRow;
use crate::etl::rules::{RuleTable, EVENT_IMPRESSION};
use crate::etl::EtlError;
use crate::store::operations::jobs::TrackedJob;
use crate::store::operations::performance::{
    JobDailyPerformance, PerformanceCounters, PerformanceDetail,
};
use crate::store::Store;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobMetricsSummary {
    pub date: Option<NaiveDate>,
    pub jobs_written: usize,
    pub rows_seen: usize,
    /// Undecodable rows plus rows no rule counted.
    pub rows_dropped: usize,
    /// Rows whose job id is not a tracked job.
    pub orphan_rows: usize,
}

#[derive(Debug, Clone, Copy, Default)]
struct DetailCounts {
    event_count: u64,
    client_count: u64,
}

/// Folds classified rows for one (job, date) into counters and merged details.
#[derive(Debug)]
pub struct PerformanceBuilder {
    job_id: u64,
    date: NaiveDate,
    counters: PerformanceCounters,
    details: BTreeMap<DetailKey, DetailCounts>,
}

impl PerformanceBuilder {
    pub fn new(job_id: u64, date: NaiveDate) -> Self {
        Self {
            job_id,
            date,
            counters: PerformanceCounters::default(),
            details: BTreeMap::new(),
        }
    }

    pub fn add(&mut self, contribution: Contribution) {
        self.counters
            .add(contribution.key.metric, contribution.event_count);
        let slot = self.details.entry(contribution.key).or_default();
        slot.event_count = slot.event_count.saturating_add(contribution.event_count);
        slot.client_count = slot.client_count.saturating_add(contribution.client_count);
    }

    pub fn add_impression_total(&mut self, clients_total: u64) {
        self.counters.impression_no_clients_total = self
            .counters
            .impression_no_clients_total
            .saturating_add(clients_total);
    }

    pub fn build(self) -> JobDailyPerformance {
        let details = self
            .details
            .into_iter()
            .map(|(key, counts)| PerformanceDetail {
                metric: key.metric,
                channel: key.channel,
                country: key.country,
                event_count: counts.event_count,
                client_count: counts.client_count,
                // Impression totals feed the counter only.
                client_count_total: 0,
            })
            .collect();
        JobDailyPerformance {
            job_id: self.job_id,
            date: self.date,
            counters: self.counters,
            details,
        }
    }
}

/// Pure fold of one job's rows. Returns the record and the number of rows no rule counted.
pub fn build_performance(
    rules: &RuleTable,
    job: &TrackedJob,
    date: NaiveDate,
    rows: &[EventRow],
    impression_totals: u64,
) -> (JobDailyPerformance, usize) {
    let mut builder = PerformanceBuilder::new(job.id, date);
    let mut dropped = 0usize;
    for row in rows {
        match classify(rules, row, &job.template) {
            Some(contribution) => builder.add(contribution),
            None => {
                tracing::debug!(
                    job_id = job.id,
                    event = %row.event,
                    context = %row.event_context,
                    "Row not counted by any rule"
                );
                dropped += 1;
            }
        }
    }
    builder.add_impression_total(impression_totals);
    (builder.build(), dropped)
}

/// Sum of `no_clients_total` per job over IMPRESSION rows of the totals report.
pub fn impression_totals_by_job(rows: Vec<Value>) -> BTreeMap<u64, u64> {
    let mut totals: BTreeMap<u64, u64> = BTreeMap::new();
    for row in rows.into_iter().filter_map(EventRow::from_value) {
        if row.event != EVENT_IMPRESSION {
            continue;
        }
        let slot = totals.entry(row.job_id).or_default();
        *slot = slot.saturating_add(row.no_clients_total);
    }
    totals
}

pub async fn run(
    adapter: &QueryAdapter,
    rules: &RuleTable,
    store: &Store,
    date: NaiveDate,
) -> Result<JobMetricsSummary, EtlError> {
    // Both reports are fetched before anything is written.
    let primary = adapter.fetch(Report::JobEvents, date).await?;
    let secondary = adapter.fetch(Report::JobImpressionTotals, date).await?;

    let mut summary = JobMetricsSummary {
        date: Some(date),
        rows_seen: primary.len(),
        ..JobMetricsSummary::default()
    };

    let mut by_job: BTreeMap<u64, Vec<EventRow>> = BTreeMap::new();
    for value in primary {
        match EventRow::from_value(value) {
            Some(row) => by_job.entry(row.job_id).or_default().push(row),
            None => summary.rows_dropped += 1,
        }
    }
    let totals = impression_totals_by_job(secondary);

    if by_job.is_empty() {
        tracing::info!(%date, "No job event rows; nothing to aggregate");
        return Ok(summary);
    }

    for (job_id, rows) in by_job {
        let Some(job) = store.get_tracked_job(job_id)? else {
            tracing::debug!(job_id, rows = rows.len(), "Discarding rows for untracked job");
            summary.orphan_rows += rows.len();
            continue;
        };

        let impression_totals = totals.get(&job_id).copied().unwrap_or(0);
        let (record, dropped) = build_performance(rules, &job, date, &rows, impression_totals);
        store.replace_job_daily_performance(&record)?;

        summary.rows_dropped += dropped;
        summary.jobs_written += 1;
    }

    tracing::info!(
        %date,
        jobs = summary.jobs_written,
        rows = summary.rows_seen,
        dropped = summary.rows_dropped,
        orphans = summary.orphan_rows,
        "Job metrics aggregated"
    );
    Ok(summary)
}
