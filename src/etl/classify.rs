use crate::constants::{COUNTRY_ERROR_PLACEHOLDER, KNOWN_CHANNELS, UNKNOWN_COUNTRY};
use crate::etl::metric::Metric;
use crate::etl::row::EventRow;
use crate::etl::rules::{RuleOutcome, RuleTable};

/// Grouping key of a performance detail entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DetailKey {
    pub metric: Metric,
    pub channel: String,
    pub country: String,
}

/// What one row contributes to a job's daily aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contribution {
    pub key: DetailKey,
    pub event_count: u64,
    pub client_count: u64,
}

/// Canonical channel for a known channel or one of its variants
/// (`releases`, `beta-test`, `nightlyz`).
pub fn canonical_channel(raw: &str) -> Option<&'static str> {
    let lowered = raw.trim().to_ascii_lowercase();
    KNOWN_CHANNELS
        .iter()
        .copied()
        .find(|known| lowered.starts_with(known))
}

/// Canonical channel when recognized, otherwise the trimmed lower-cased input.
pub fn normalize_channel(raw: &str) -> String {
    match canonical_channel(raw) {
        Some(channel) => channel.to_string(),
        None => raw.trim().to_ascii_lowercase(),
    }
}

pub fn normalize_country(raw: &str) -> String {
    let upper = raw.trim().to_ascii_uppercase();
    if upper.is_empty() || upper == COUNTRY_ERROR_PLACEHOLDER {
        UNKNOWN_COUNTRY.to_string()
    } else {
        upper
    }
}

/// Classify a row for a job with `template`. `None` means the row is dropped.
pub fn classify(rules: &RuleTable, row: &EventRow, template: &str) -> Option<Contribution> {
    let metric = match rules.classify(row, template) {
        RuleOutcome::Counted(metric) => metric,
        RuleOutcome::Ignored | RuleOutcome::Unmatched => return None,
    };
    Some(Contribution {
        key: DetailKey {
            metric,
            channel: normalize_channel(&row.channel),
            country: normalize_country(&row.country_code),
        },
        event_count: row.counts,
        client_count: row.no_clients,
    })
}
