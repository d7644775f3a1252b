pub mod daily_impressions;
pub mod job_metrics;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{Days, NaiveDate, Utc};
use tokio::sync::broadcast;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::config::WorkerConfig;
use crate::etl::Etl;
use crate::store::Store;

/// Timeout for individual worker invocations (5 minutes).
const WORKER_TIMEOUT: Duration = Duration::from_secs(300);

/// Drain period before scheduler shutdown to let in-flight tasks complete.
#[cfg(test)]
const DRAIN_TIMEOUT: Duration = Duration::from_millis(10);
#[cfg(not(test))]
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkerName {
    HourlyJobMetrics,
    DailyJobMetrics,
    DailyImpressions,
}

impl WorkerName {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HourlyJobMetrics => "hourly_job_metrics",
            Self::DailyJobMetrics => "daily_job_metrics",
            Self::DailyImpressions => "daily_impressions",
        }
    }

    /// Bind date for a run starting at `today` (UTC).
    pub fn target_date(self, today: NaiveDate) -> NaiveDate {
        match self {
            Self::HourlyJobMetrics => today,
            Self::DailyJobMetrics | Self::DailyImpressions => {
                today.checked_sub_days(Days::new(1)).unwrap_or(today)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSpec {
    pub name: WorkerName,
    pub cron: &'static str,
    pub enabled: bool,
}

pub struct WorkerManager {
    store: Arc<Store>,
    etl: Arc<Etl>,
    shutdown_rx: broadcast::Receiver<()>,
    config: WorkerConfig,
    query_configured: bool,
}

impl WorkerManager {
    pub fn new(
        store: Arc<Store>,
        etl: Arc<Etl>,
        shutdown_rx: broadcast::Receiver<()>,
        config: &WorkerConfig,
        query_configured: bool,
    ) -> Self {
        Self {
            store,
            etl,
            shutdown_rx,
            config: config.clone(),
            query_configured,
        }
    }

    /// Single source of truth for all planned jobs and their cron schedules.
    pub fn planned_jobs(&self) -> Vec<JobSpec> {
        if !self.config.is_leader {
            return Vec::new();
        }

        // Without query credentials every run would fail.
        let query = self.query_configured;
        vec![
            JobSpec {
                name: WorkerName::HourlyJobMetrics,
                cron: "0 10 * * * *",
                enabled: query && self.config.enable_job_metrics,
            },
            JobSpec {
                name: WorkerName::DailyJobMetrics,
                cron: "0 0 4 * * *",
                enabled: query && self.config.enable_job_metrics,
            },
            JobSpec {
                name: WorkerName::DailyImpressions,
                cron: "0 5 4 * * *",
                enabled: query && self.config.enable_impressions,
            },
        ]
    }

    /// Start the worker scheduler. Returns an error if the scheduler cannot be created or started.
    pub async fn start(mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if !self.config.is_leader {
            tracing::info!("Worker leader disabled; skipping worker startup");
            return Ok(());
        }

        let mut scheduler = JobScheduler::new().await?;

        self.register_jobs(&scheduler).await;

        scheduler.start().await?;

        tracing::info!("Worker manager started");
        let _ = self.shutdown_rx.recv().await;

        tracing::info!(
            "Worker manager shutting down, draining for {}s",
            DRAIN_TIMEOUT.as_secs()
        );
        tokio::time::sleep(DRAIN_TIMEOUT).await;
        let _ = scheduler.shutdown().await;
        Ok(())
    }

    async fn register_jobs(&self, scheduler: &JobScheduler) {
        for spec in self.planned_jobs() {
            if !spec.enabled {
                tracing::info!(name = spec.name.as_str(), "Skipping disabled worker");
                continue;
            }

            let store = self.store.clone();
            let etl = self.etl.clone();
            let name = spec.name;

            add_job(scheduler, spec.cron, name.as_str(), move || {
                let store = store.clone();
                let etl = etl.clone();
                async move {
                    let date = name.target_date(Utc::now().date_naive());
                    match name {
                        WorkerName::HourlyJobMetrics | WorkerName::DailyJobMetrics => {
                            job_metrics::run(&store, &etl, date).await;
                        }
                        WorkerName::DailyImpressions => {
                            daily_impressions::run(&store, &etl, date).await;
                        }
                    }
                }
            })
            .await;
            tracing::info!(name = name.as_str(), cron = spec.cron, "Registered worker");
        }
    }
}

/// Add a job to the scheduler with an overlap guard and timeout wrapper.
async fn add_job<Fut, F>(scheduler: &JobScheduler, cron: &str, name: &'static str, mut run: F)
where
    F: FnMut() -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    let running = Arc::new(AtomicBool::new(false));

    let job = Job::new_async(cron, move |_uuid, _lock| {
        let guard = running.clone();

        if guard
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::warn!(
                worker = name,
                "Skipping worker invocation: previous run still in progress"
            );
            return Box::pin(async {});
        }

        let fut = run();
        Box::pin(async move {
            if tokio::time::timeout(WORKER_TIMEOUT, fut).await.is_err() {
                tracing::error!(
                    worker = name,
                    timeout_secs = WORKER_TIMEOUT.as_secs(),
                    "Worker timed out"
                );
            }
            guard.store(false, Ordering::SeqCst);
        })
    });

    match job {
        Ok(job) => {
            if let Err(err) = scheduler.add(job).await {
                tracing::error!(error = %err, cron, worker = name, "Failed to add worker job");
            }
        }
        Err(err) => tracing::error!(error = %err, cron, worker = name, "Failed to create worker job"),
    }
}
