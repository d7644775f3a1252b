use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{json, Map, Value};

use crate::config::{RedashConfig, ReportQueryIds};
use crate::constants::BIND_DATE_PARAM;
use crate::store::keys;

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("query service request timed out")]
    Timeout,
    #[error("query service transport error: {0}")]
    Transport(String),
    #[error("query service error: status={status}, message={message}")]
    Status { status: u16, message: String },
    #[error("query job {job_id} failed: {message}")]
    JobFailed { job_id: String, message: String },
    #[error("malformed query response: missing `{0}`")]
    Envelope(&'static str),
}

impl From<reqwest::Error> for QueryError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            QueryError::Timeout
        } else {
            QueryError::Transport(e.to_string())
        }
    }
}

/// Named reports the aggregators run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Report {
    JobEvents,
    JobImpressionTotals,
    ChannelImpressions,
}

impl Report {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::JobEvents => "job-events",
            Self::JobImpressionTotals => "job-impression-totals",
            Self::ChannelImpressions => "channel-impressions",
        }
    }

    pub fn query_id(self, ids: &ReportQueryIds) -> u64 {
        match self {
            Self::JobEvents => ids.job_events,
            Self::JobImpressionTotals => ids.job_impression_totals,
            Self::ChannelImpressions => ids.channel_impressions,
        }
    }
}

/// Remote execution of a stored query; returns the raw response envelope.
#[async_trait]
pub trait QueryService: Send + Sync {
    async fn execute(&self, query_id: u64, params: &Map<String, Value>)
        -> Result<Value, QueryError>;
}

/// Maps reports to query ids, binds the date, and unwraps the envelope.
#[derive(Clone)]
pub struct QueryAdapter {
    service: Arc<dyn QueryService>,
    queries: ReportQueryIds,
}

impl QueryAdapter {
    pub fn new(service: Arc<dyn QueryService>, queries: ReportQueryIds) -> Self {
        Self { service, queries }
    }

    pub fn bind_params(date: NaiveDate) -> Map<String, Value> {
        let mut params = Map::new();
        params.insert(BIND_DATE_PARAM.to_string(), json!(keys::date_key(date)));
        params
    }

    pub async fn fetch(&self, report: Report, date: NaiveDate) -> Result<Vec<Value>, QueryError> {
        let query_id = report.query_id(&self.queries);
        let envelope = self
            .service
            .execute(query_id, &Self::bind_params(date))
            .await?;
        let rows = unwrap_rows(envelope)?;
        tracing::debug!(
            report = report.as_str(),
            query_id,
            %date,
            rows = rows.len(),
            "Fetched report rows"
        );
        Ok(rows)
    }
}

/// `{query_result: {data: {rows: [...]}}}` → `rows`.
pub fn unwrap_rows(envelope: Value) -> Result<Vec<Value>, QueryError> {
    let Value::Object(mut root) = envelope else {
        return Err(QueryError::Envelope("query_result"));
    };
    let Some(Value::Object(mut result)) = root.remove("query_result") else {
        return Err(QueryError::Envelope("query_result"));
    };
    let Some(Value::Object(mut data)) = result.remove("data") else {
        return Err(QueryError::Envelope("query_result.data"));
    };
    match data.remove("rows") {
        Some(Value::Array(rows)) => Ok(rows),
        _ => Err(QueryError::Envelope("query_result.data.rows")),
    }
}

const JOB_STATUS_SUCCESS: u64 = 3;
const JOB_STATUS_FAILURE: u64 = 4;
const JOB_STATUS_CANCELLED: u64 = 5;

/// HTTP client for a Redash-compatible query service.
///
/// Cached results come back directly; otherwise the service returns a job
/// which is polled until it settles.
#[derive(Debug, Clone)]
pub struct RedashClient {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    poll_interval: Duration,
    max_polls: u32,
}

impl RedashClient {
    pub fn new(config: &RedashConfig) -> Result<Self, QueryError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            max_polls: config.max_polls,
        })
    }

    fn auth_header(&self) -> String {
        format!("Key {}", self.api_key)
    }

    async fn get_json(&self, path: &str) -> Result<Value, QueryError> {
        let resp = self
            .client
            .get(format!("{}{}", self.api_url, path))
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
            .send()
            .await?;
        read_json(resp).await
    }

    async fn wait_for_job(&self, job: &Value) -> Result<Value, QueryError> {
        let job_id = job
            .get("id")
            .map(|id| match id {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .ok_or(QueryError::Envelope("job.id"))?;

        for attempt in 0..self.max_polls {
            let polled = self.get_json(&format!("/api/jobs/{job_id}")).await?;
            let job = polled.get("job").ok_or(QueryError::Envelope("job"))?;
            match job.get("status").and_then(Value::as_u64) {
                Some(JOB_STATUS_SUCCESS) => {
                    let result_id = job
                        .get("query_result_id")
                        .and_then(Value::as_u64)
                        .ok_or(QueryError::Envelope("job.query_result_id"))?;
                    return self
                        .get_json(&format!("/api/query_results/{result_id}"))
                        .await;
                }
                Some(JOB_STATUS_FAILURE) | Some(JOB_STATUS_CANCELLED) => {
                    let message = job
                        .get("error")
                        .and_then(Value::as_str)
                        .unwrap_or("unknown error")
                        .to_string();
                    return Err(QueryError::JobFailed { job_id, message });
                }
                _ => {
                    tracing::debug!(job_id = %job_id, attempt, "Query job still running");
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }

        tracing::warn!(job_id = %job_id, polls = self.max_polls, "Query job poll budget exhausted");
        Err(QueryError::Timeout)
    }
}

#[async_trait]
impl QueryService for RedashClient {
    async fn execute(
        &self,
        query_id: u64,
        params: &Map<String, Value>,
    ) -> Result<Value, QueryError> {
        let resp = self
            .client
            .post(format!("{}/api/queries/{query_id}/results", self.api_url))
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
            .json(&json!({ "parameters": params, "max_age": 0 }))
            .send()
            .await?;
        let body = read_json(resp).await?;

        if body.get("query_result").is_some() {
            return Ok(body);
        }
        match body.get("job") {
            Some(job) => self.wait_for_job(job).await,
            None => Err(QueryError::Envelope("query_result")),
        }
    }
}

async fn read_json(resp: reqwest::Response) -> Result<Value, QueryError> {
    let status = resp.status();
    if !status.is_success() {
        let message = resp.text().await.unwrap_or_default();
        return Err(QueryError::Status {
            status: status.as_u16(),
            message,
        });
    }
    Ok(resp.json::<Value>().await?)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    struct Recording {
        calls: Mutex<Vec<(u64, Map<String, Value>)>>,
        response: Value,
    }

    #[async_trait]
    impl QueryService for Recording {
        async fn execute(
            &self,
            query_id: u64,
            params: &Map<String, Value>,
        ) -> Result<Value, QueryError> {
            self.calls
                .lock()
                .expect("calls lock")
                .push((query_id, params.clone()));
            Ok(self.response.clone())
        }
    }

    #[tokio::test]
    async fn fetch_binds_date_and_unwraps_rows() {
        let service = Arc::new(Recording {
            calls: Mutex::new(Vec::new()),
            response: json!({"query_result": {"data": {"rows": ["mock rows"]}}}),
        });
        let adapter = QueryAdapter::new(service.clone(), ReportQueryIds::default());
        let date = NaiveDate::from_ymd_opt(2019, 12, 19).unwrap();

        let rows = adapter.fetch(Report::JobEvents, date).await.unwrap();
        assert_eq!(rows, vec![json!("mock rows")]);

        let calls = service.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, ReportQueryIds::default().job_events);
        assert_eq!(calls[0].1.get("date"), Some(&json!("2019-12-19")));
    }

    #[test]
    fn missing_envelope_keys_are_reported() {
        assert!(matches!(
            unwrap_rows(json!({})),
            Err(QueryError::Envelope("query_result"))
        ));
        assert!(matches!(
            unwrap_rows(json!({"query_result": {}})),
            Err(QueryError::Envelope("query_result.data"))
        ));
        assert!(matches!(
            unwrap_rows(json!({"query_result": {"data": {"rows": {}}}})),
            Err(QueryError::Envelope("query_result.data.rows"))
        ));
        assert!(matches!(
            unwrap_rows(json!([1, 2])),
            Err(QueryError::Envelope(_))
        ));
    }

    #[test]
    fn reports_map_to_configured_ids() {
        let ids = ReportQueryIds {
            job_events: 1,
            job_impression_totals: 2,
            channel_impressions: 3,
        };
        assert_eq!(Report::JobEvents.query_id(&ids), 1);
        assert_eq!(Report::JobImpressionTotals.query_id(&ids), 2);
        assert_eq!(Report::ChannelImpressions.query_id(&ids), 3);
    }
}
