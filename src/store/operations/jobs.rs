use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::keys;
use crate::store::{Store, StoreError};

/// A content unit registered by the external content system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedJob {
    pub id: u64,
    /// Template code name, consulted by the residual click policy.
    pub template: String,
    #[serde(default)]
    pub name: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl TrackedJob {
    pub fn new(id: u64, template: &str) -> Self {
        Self {
            id,
            template: Self::normalize_template(template),
            name: None,
            updated_at: Utc::now(),
        }
    }

    pub fn normalize_template(raw: &str) -> String {
        raw.trim().to_ascii_lowercase()
    }
}

impl Store {
    pub fn upsert_tracked_job(&self, job: &TrackedJob) -> Result<(), StoreError> {
        let template = TrackedJob::normalize_template(&job.template);
        if template.is_empty() {
            return Err(StoreError::Validation(format!(
                "tracked job {} has an empty template",
                job.id
            )));
        }

        let stored = TrackedJob {
            template,
            ..job.clone()
        };
        let key = keys::tracked_job_key(job.id);
        self.tracked_jobs
            .insert(key.as_bytes(), Self::serialize(&stored)?)?;
        Ok(())
    }

    pub fn get_tracked_job(&self, job_id: u64) -> Result<Option<TrackedJob>, StoreError> {
        let key = keys::tracked_job_key(job_id);
        match self.tracked_jobs.get(key.as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn count_tracked_jobs(&self) -> usize {
        self.tracked_jobs.len()
    }
}
