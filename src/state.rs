use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::etl::Etl;
use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    store: Arc<Store>,
    etl: Arc<Etl>,
    config: Arc<Config>,
    started_at: Instant,
}

impl AppState {
    pub fn new(store: Arc<Store>, etl: Arc<Etl>, config: &Config) -> Self {
        Self {
            store,
            etl,
            config: Arc::new(config.clone()),
            started_at: Instant::now(),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn etl(&self) -> &Etl {
        &self.etl
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
