use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::store::keys;
use crate::store::{Store, StoreError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImpressionDetail {
    pub channel: String,
    pub duration: String,
    pub event_count: u64,
    pub client_count: u64,
}

/// Channel impressions for one calendar date, unique by `(channel, duration)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyImpressions {
    pub date: NaiveDate,
    pub details: Vec<ImpressionDetail>,
}

impl Store {
    pub fn replace_daily_impressions(&self, record: &DailyImpressions) -> Result<(), StoreError> {
        let key = keys::daily_impressions_key(record.date);
        self.daily_impressions
            .insert(key.as_bytes(), Self::serialize(record)?)?;
        Ok(())
    }

    pub fn get_daily_impressions(
        &self,
        date: NaiveDate,
    ) -> Result<Option<DailyImpressions>, StoreError> {
        let key = keys::daily_impressions_key(date);
        match self.daily_impressions.get(key.as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn count_daily_impressions(&self) -> usize {
        self.daily_impressions.len()
    }
}
