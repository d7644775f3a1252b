use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::etl::metric::Metric;
use crate::store::keys;
use crate::store::{Store, StoreError};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceCounters {
    pub impression: u64,
    /// Fed only by the impression-totals report; has no backing detail entries.
    pub impression_no_clients_total: u64,
    pub click: u64,
    pub block: u64,
    pub dismiss: u64,
    pub go_to_scene2: u64,
    pub subscribe_error: u64,
    pub subscribe_success: u64,
    pub other_click: u64,
}

impl PerformanceCounters {
    pub fn get(&self, metric: Metric) -> u64 {
        match metric {
            Metric::Impression => self.impression,
            Metric::Click => self.click,
            Metric::Block => self.block,
            Metric::Dismiss => self.dismiss,
            Metric::GoToScene2 => self.go_to_scene2,
            Metric::SubscribeError => self.subscribe_error,
            Metric::SubscribeSuccess => self.subscribe_success,
            Metric::OtherClick => self.other_click,
        }
    }

    pub fn add(&mut self, metric: Metric, count: u64) {
        let slot = match metric {
            Metric::Impression => &mut self.impression,
            Metric::Click => &mut self.click,
            Metric::Block => &mut self.block,
            Metric::Dismiss => &mut self.dismiss,
            Metric::GoToScene2 => &mut self.go_to_scene2,
            Metric::SubscribeError => &mut self.subscribe_error,
            Metric::SubscribeSuccess => &mut self.subscribe_success,
            Metric::OtherClick => &mut self.other_click,
        };
        *slot = slot.saturating_add(count);
    }

    pub fn merge(&mut self, other: &PerformanceCounters) {
        for metric in Metric::ALL {
            self.add(metric, other.get(metric));
        }
        self.impression_no_clients_total = self
            .impression_no_clients_total
            .saturating_add(other.impression_no_clients_total);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceDetail {
    pub metric: Metric,
    pub channel: String,
    pub country: String,
    pub event_count: u64,
    pub client_count: u64,
    pub client_count_total: u64,
}

impl PerformanceDetail {
    pub fn sort_key(&self) -> (Metric, &str, &str) {
        (self.metric, &self.channel, &self.country)
    }
}

/// Aggregate for one tracked job on one calendar date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDailyPerformance {
    pub job_id: u64,
    pub date: NaiveDate,
    pub counters: PerformanceCounters,
    pub details: Vec<PerformanceDetail>,
}

impl JobDailyPerformance {
    pub fn detail_sum(&self, metric: Metric) -> u64 {
        self.details
            .iter()
            .filter(|d| d.metric == metric)
            .map(|d| d.event_count)
            .sum()
    }
}

/// Lifetime rollup of every stored day for one job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobTotals {
    pub job_id: u64,
    pub days: u64,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub counters: PerformanceCounters,
}

impl Store {
    /// Replace the whole record for `(job_id, date)` in a single write.
    pub fn replace_job_daily_performance(
        &self,
        record: &JobDailyPerformance,
    ) -> Result<(), StoreError> {
        let key = keys::job_daily_performance_key(record.job_id, record.date);
        self.job_daily_performance
            .insert(key.as_bytes(), Self::serialize(record)?)?;
        Ok(())
    }

    pub fn get_job_daily_performance(
        &self,
        job_id: u64,
        date: NaiveDate,
    ) -> Result<Option<JobDailyPerformance>, StoreError> {
        let key = keys::job_daily_performance_key(job_id, date);
        match self.job_daily_performance.get(key.as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    /// All stored days for a job, oldest first.
    pub fn list_job_daily_performance(
        &self,
        job_id: u64,
    ) -> Result<Vec<JobDailyPerformance>, StoreError> {
        let prefix = keys::job_daily_performance_prefix(job_id);
        let mut out = Vec::new();
        for item in self.job_daily_performance.scan_prefix(prefix.as_bytes()) {
            let (_, raw) = item?;
            out.push(Self::deserialize(&raw)?);
        }
        Ok(out)
    }

    pub fn job_totals(&self, job_id: u64) -> Result<JobTotals, StoreError> {
        let mut totals = JobTotals {
            job_id,
            ..JobTotals::default()
        };
        for record in self.list_job_daily_performance(job_id)? {
            totals.days += 1;
            totals.first_date.get_or_insert(record.date);
            totals.last_date = Some(record.date);
            totals.counters.merge(&record.counters);
        }
        Ok(totals)
    }

    pub fn count_job_daily_performance(&self) -> usize {
        self.job_daily_performance.len()
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 1, d).unwrap()
    }

    fn record(job_id: u64, date: NaiveDate, impression: u64) -> JobDailyPerformance {
        JobDailyPerformance {
            job_id,
            date,
            counters: PerformanceCounters {
                impression,
                impression_no_clients_total: impression * 2,
                ..PerformanceCounters::default()
            },
            details: vec![PerformanceDetail {
                metric: Metric::Impression,
                channel: "release".to_string(),
                country: "ES".to_string(),
                event_count: impression,
                client_count: 1,
                client_count_total: 0,
            }],
        }
    }

    #[test]
    fn replace_overwrites_instead_of_accumulating() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("perf-db").to_str().unwrap()).unwrap();

        store.replace_job_daily_performance(&record(1, day(9), 100)).unwrap();
        store.replace_job_daily_performance(&record(1, day(9), 30)).unwrap();

        let got = store.get_job_daily_performance(1, day(9)).unwrap().unwrap();
        assert_eq!(got.counters.impression, 30);
        assert_eq!(got.details.len(), 1);
        assert_eq!(store.count_job_daily_performance(), 1);
    }

    #[test]
    fn totals_roll_up_every_day_of_one_job() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("perf-db-2").to_str().unwrap()).unwrap();

        store.replace_job_daily_performance(&record(1, day(10), 20)).unwrap();
        store.replace_job_daily_performance(&record(1, day(9), 10)).unwrap();
        store.replace_job_daily_performance(&record(10, day(9), 500)).unwrap();

        let totals = store.job_totals(1).unwrap();
        assert_eq!(totals.days, 2);
        assert_eq!(totals.counters.impression, 30);
        assert_eq!(totals.counters.impression_no_clients_total, 60);
        assert_eq!(totals.first_date, Some(day(9)));
        assert_eq!(totals.last_date, Some(day(10)));

        let empty = store.job_totals(2).unwrap();
        assert_eq!(empty.days, 0);
        assert_eq!(empty.first_date, None);
    }

    #[test]
    fn counters_add_by_metric() {
        let mut counters = PerformanceCounters::default();
        counters.add(Metric::GoToScene2, 4);
        counters.add(Metric::GoToScene2, 40);
        counters.add(Metric::OtherClick, 1);
        assert_eq!(counters.go_to_scene2, 44);
        assert_eq!(counters.get(Metric::OtherClick), 1);
        assert_eq!(counters.get(Metric::Click), 0);
    }
}
