use std::env;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

use std::fmt;

use crate::constants::{
    DEFAULT_QUERY_ID_CHANNEL_IMPRESSIONS, DEFAULT_QUERY_ID_JOB_EVENTS,
    DEFAULT_QUERY_ID_JOB_IMPRESSION_TOTALS,
};

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub enable_file_logs: bool,
    pub log_dir: String,
    pub sled_path: String,
    pub cors_origin: String,
    pub rules_path: Option<String>,
    pub worker: WorkerConfig,
    pub redash: RedashConfig,
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub is_leader: bool,
    pub enable_job_metrics: bool,
    pub enable_impressions: bool,
}

#[derive(Clone)]
pub struct RedashConfig {
    pub api_url: String,
    pub api_key: String,
    pub timeout_secs: u64,
    pub poll_interval_ms: u64,
    pub max_polls: u32,
    pub queries: ReportQueryIds,
}

/// Server-side query ids backing each named report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportQueryIds {
    pub job_events: u64,
    pub job_impression_totals: u64,
    pub channel_impressions: u64,
}

impl Default for ReportQueryIds {
    fn default() -> Self {
        Self {
            job_events: DEFAULT_QUERY_ID_JOB_EVENTS,
            job_impression_totals: DEFAULT_QUERY_ID_JOB_IMPRESSION_TOTALS,
            channel_impressions: DEFAULT_QUERY_ID_CHANNEL_IMPRESSIONS,
        }
    }
}

impl fmt::Debug for RedashConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedashConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &"***REDACTED***")
            .field("timeout_secs", &self.timeout_secs)
            .field("poll_interval_ms", &self.poll_interval_ms)
            .field("max_polls", &self.max_polls)
            .field("queries", &self.queries)
            .finish()
    }
}

impl RedashConfig {
    pub fn has_credentials(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            host: env_or_parse("HOST", IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))),
            port: env_or_parse("PORT", 3000_u16),
            log_level: env_or("RUST_LOG", "info"),
            enable_file_logs: env_or_bool("ENABLE_FILE_LOGS", false),
            log_dir: env_or("LOG_DIR", "./logs"),
            sled_path: env_or("SLED_PATH", "./data/snippets-etl.sled"),
            cors_origin: env_or("CORS_ORIGIN", "*"),
            rules_path: env_opt("CLASSIFICATION_RULES_PATH"),
            worker: WorkerConfig {
                is_leader: env_or_bool("WORKER_LEADER", true),
                enable_job_metrics: env_or_bool("ENABLE_JOB_METRICS_WORKER", true),
                enable_impressions: env_or_bool("ENABLE_IMPRESSIONS_WORKER", true),
            },
            redash: RedashConfig {
                api_url: env_or("REDASH_API_URL", "https://sql.telemetry.mozilla.org"),
                api_key: env_or("REDASH_API_KEY", ""),
                timeout_secs: env_or_parse("REDASH_TIMEOUT_SECS", 60_u64),
                poll_interval_ms: env_or_parse("REDASH_POLL_INTERVAL_MS", 1000_u64),
                max_polls: env_or_parse("REDASH_MAX_POLLS", 120_u32),
                queries: ReportQueryIds {
                    job_events: env_or_parse(
                        "REDASH_QUERY_JOB_EVENTS",
                        DEFAULT_QUERY_ID_JOB_EVENTS,
                    ),
                    job_impression_totals: env_or_parse(
                        "REDASH_QUERY_JOB_IMPRESSION_TOTALS",
                        DEFAULT_QUERY_ID_JOB_IMPRESSION_TOTALS,
                    ),
                    channel_impressions: env_or_parse(
                        "REDASH_QUERY_CHANNEL_IMPRESSIONS",
                        DEFAULT_QUERY_ID_CHANNEL_IMPRESSIONS,
                    ),
                },
            },
        }
    }
}

pub fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

pub fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

pub fn env_or_parse<T>(key: &str, default: T) -> T
where
    T: FromStr + Copy,
{
    match env::var(key) {
        Ok(raw) => match raw.parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(
                    key,
                    value = %raw,
                    "Failed to parse env var, using default"
                );
                default
            }
        },
        Err(_) => default,
    }
}

pub fn env_or_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Mutex, OnceLock};

    use super::*;

    fn env_lock() -> &'static Mutex<()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(()))
    }

    fn managed_keys() -> &'static [&'static str] {
        &[
            "HOST",
            "PORT",
            "RUST_LOG",
            "REDASH_API_KEY",
            "REDASH_TIMEOUT_SECS",
            "REDASH_QUERY_JOB_EVENTS",
            "CLASSIFICATION_RULES_PATH",
            "WORKER_LEADER",
        ]
    }

    fn clear_keys(keys: &[&str]) {
        for key in keys {
            env::remove_var(key);
        }
    }

    #[test]
    fn loads_defaults_when_missing() {
        let _guard = env_lock().lock().expect("env lock");
        clear_keys(managed_keys());

        let cfg = Config::from_env();
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.log_level, "info");
        assert_eq!(cfg.redash.queries, ReportQueryIds::default());
        assert!(!cfg.redash.has_credentials());
        assert!(cfg.rules_path.is_none());
        assert!(cfg.worker.is_leader);
    }

    #[test]
    fn parses_numeric_values() {
        let _guard = env_lock().lock().expect("env lock");
        clear_keys(managed_keys());

        env::set_var("PORT", "4000");
        env::set_var("REDASH_TIMEOUT_SECS", "5");
        env::set_var("REDASH_QUERY_JOB_EVENTS", "42");

        let cfg = Config::from_env();
        assert_eq!(cfg.port, 4000);
        assert_eq!(cfg.redash.timeout_secs, 5);
        assert_eq!(cfg.redash.queries.job_events, 42);
        clear_keys(managed_keys());
    }

    #[test]
    fn invalid_values_fall_back() {
        let _guard = env_lock().lock().expect("env lock");
        clear_keys(managed_keys());

        env::set_var("PORT", "bad");
        env::set_var("REDASH_QUERY_JOB_EVENTS", "x");

        let cfg = Config::from_env();
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.redash.queries.job_events, DEFAULT_QUERY_ID_JOB_EVENTS);
        clear_keys(managed_keys());
    }

    #[test]
    fn api_key_is_redacted_in_debug() {
        let _guard = env_lock().lock().expect("env lock");
        clear_keys(managed_keys());

        env::set_var("REDASH_API_KEY", "super-secret-key");
        let cfg = Config::from_env();
        assert!(cfg.redash.has_credentials());
        let rendered = format!("{:?}", cfg);
        assert!(!rendered.contains("super-secret-key"));
        assert!(rendered.contains("***REDACTED***"));
        clear_keys(managed_keys());
    }
}
