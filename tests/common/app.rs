use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use serde_json::{Map, Value};
use tempfile::TempDir;

use snippets_etl::config::{Config, RedashConfig, ReportQueryIds, WorkerConfig};
use snippets_etl::etl::query::{QueryAdapter, QueryError, QueryService};
use snippets_etl::etl::rules::RuleTable;
use snippets_etl::etl::Etl;
use snippets_etl::routes::build_router;
use snippets_etl::state::AppState;
use snippets_etl::store::Store;

use super::fixtures::envelope;

/// Query service stub answering from per-query scripted envelopes.
///
/// Queries without a script return an empty row set.
#[derive(Default)]
pub struct ScriptedQueryService {
    responses: Mutex<HashMap<u64, Result<Value, String>>>,
    calls: Mutex<Vec<(u64, Map<String, Value>)>>,
}

impl ScriptedQueryService {
    pub fn set_rows(&self, query_id: u64, rows: Vec<Value>) {
        self.responses
            .lock()
            .expect("responses lock")
            .insert(query_id, Ok(envelope(rows)));
    }

    pub fn set_envelope(&self, query_id: u64, envelope: Value) {
        self.responses
            .lock()
            .expect("responses lock")
            .insert(query_id, Ok(envelope));
    }

    pub fn fail(&self, query_id: u64, message: &str) {
        self.responses
            .lock()
            .expect("responses lock")
            .insert(query_id, Err(message.to_string()));
    }

    pub fn calls(&self) -> Vec<(u64, Map<String, Value>)> {
        self.calls.lock().expect("calls lock").clone()
    }
}

#[async_trait]
impl QueryService for ScriptedQueryService {
    async fn execute(
        &self,
        query_id: u64,
        params: &Map<String, Value>,
    ) -> Result<Value, QueryError> {
        self.calls
            .lock()
            .expect("calls lock")
            .push((query_id, params.clone()));
        match self.responses.lock().expect("responses lock").get(&query_id) {
            Some(Ok(envelope)) => Ok(envelope.clone()),
            Some(Err(message)) => Err(QueryError::Status {
                status: 500,
                message: message.clone(),
            }),
            None => Ok(envelope(Vec::new())),
        }
    }
}

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub config: Config,
    pub store: Arc<Store>,
    pub etl: Arc<Etl>,
    pub service: Arc<ScriptedQueryService>,
    _temp_dir: TempDir,
}

pub fn queries() -> ReportQueryIds {
    ReportQueryIds::default()
}

pub fn test_config(sled_path: &str) -> Config {
    // Built directly; set_var would race across parallel tests.
    Config {
        host: std::net::IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1)),
        port: 3000,
        log_level: "info".to_string(),
        enable_file_logs: false,
        log_dir: "./logs".to_string(),
        sled_path: sled_path.to_string(),
        cors_origin: "*".to_string(),
        rules_path: None,
        worker: WorkerConfig {
            is_leader: false,
            enable_job_metrics: true,
            enable_impressions: true,
        },
        redash: RedashConfig {
            api_url: "http://127.0.0.1:9".to_string(),
            api_key: String::new(),
            timeout_secs: 5,
            poll_interval_ms: 10,
            max_polls: 5,
            queries: queries(),
        },
    }
}

pub async fn spawn_test_app() -> TestApp {
    let temp_dir = tempfile::tempdir().expect("tempdir");
    let sled_path = temp_dir.path().join("snippets-etl-test.sled");
    let config = test_config(&sled_path.to_string_lossy());

    let store = Arc::new(Store::open(&config.sled_path).expect("open store"));
    store.run_migrations().expect("run migrations");

    let service = Arc::new(ScriptedQueryService::default());
    let adapter = QueryAdapter::new(service.clone(), config.redash.queries);
    let etl = Arc::new(Etl::new(adapter, Arc::new(RuleTable::default())));

    let state = AppState::new(store.clone(), etl.clone(), &config);
    let app = build_router(state.clone());

    TestApp {
        app,
        state,
        config,
        store,
        etl,
        service,
        _temp_dir: temp_dir,
    }
}
