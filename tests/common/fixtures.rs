use chrono::NaiveDate;
use serde_json::{json, Value};

use snippets_etl::etl::rules::TEMPLATE_MULTI_SCENE;
use snippets_etl::store::operations::jobs::TrackedJob;
use snippets_etl::store::Store;

pub const SIMPLE_JOB: u64 = 1000;
pub const MULTI_SCENE_JOB: u64 = 2000;
pub const UNTRACKED_JOB: u64 = 500;

pub fn scenario_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 10).expect("valid date")
}

pub fn envelope(rows: Vec<Value>) -> Value {
    json!({"query_result": {"data": {"rows": rows}}})
}

pub fn seed_scenario_jobs(store: &Store) {
    store
        .upsert_tracked_job(&TrackedJob::new(SIMPLE_JOB, "simple_snippet"))
        .expect("seed simple job");
    store
        .upsert_tracked_job(&TrackedJob::new(MULTI_SCENE_JOB, TEMPLATE_MULTI_SCENE))
        .expect("seed multi-scene job");
}

fn event(
    job: &str,
    context: &str,
    event: &str,
    properties: Option<&str>,
    channel: &str,
    country: &str,
    counts: u64,
    no_clients: u64,
) -> Value {
    let mut row = json!({
        "message_id": job,
        "event_context": context,
        "event": event,
        "channel": channel,
        "country_code": country,
        "counts": counts,
        "no_clients": no_clients,
        "no_clients_total": 0,
    });
    if let Some(props) = properties {
        row["additional_properties"] = json!(props);
    }
    row
}

/// Job events report for the two scenario jobs plus one untracked job.
pub fn job_event_rows() -> Vec<Value> {
    vec![
        event("1000", "{}", "CLICK_BUTTON", None, "release", "GR", 5, 2),
        event("1000", "{}", "IMPRESSION", None, "release", "ES", 30, 10),
        event("1000", "{}", "IMPRESSION", None, "release", "IT", 50, 20),
        event("1000", "{}", "BLOCK", None, "releases", "UK", 23, 9),
        event("1000", "{}", "BLOCK", None, "beta-test", "SW", 27, 50),
        event(
            "1000",
            "EOYSnippetForm",
            "CLICK_BUTTON",
            Some(r#"{"source":"NEWTAB_FOOTER_BAR_CONTENT","id":"NEWTAB_FOOTER_BAR_CONTENT"}"#),
            "release",
            "IT",
            10,
            4,
        ),
        event("500", "{}", "CLICK", None, "demo", "GR", 5, 10),
        event("1000", "", "CLICK", None, "release", "GR", 6, 10),
        event(
            "2000",
            "{}",
            "CLICK_BUTTON",
            Some(r#"{"value": "scene1-button-learn-more", "foo": "bar"}"#),
            "release",
            "GR",
            44,
            33,
        ),
        event("2000", "{}", "CLICK_BUTTON", None, "release", "BG", 3, 10),
        event("2000", "{}", "CLICK_BUTTON", None, "release", "AL", 1, 10),
        event(
            "2000",
            "conversion-subscribe-activation",
            "CLICK_BUTTON",
            Some(r#"{"foo": "bar"}"#),
            "release",
            "GR",
            5,
            8,
        ),
        event(
            "2000",
            "subscribe-error",
            "CLICK_BUTTON",
            Some(r#"{"foo": "bar"}"#),
            "release",
            "GR",
            3,
            4,
        ),
        event("2000", "subscribe-success", "CLICK_BUTTON", None, "release", "ERROR", 9, 57),
        event("2000", "", "DISMISS", None, "beta", "ERROR", 1, 1),
    ]
}

pub fn impression_total_rows() -> Vec<Value> {
    vec![
        json!({"message_id": "1000", "event_context": "", "event": "IMPRESSION",
            "channel": "release", "country_code": "ES", "counts": 0, "no_clients": 0,
            "no_clients_total": 232}),
        json!({"message_id": "1000", "event_context": "", "event": "IMPRESSION",
            "channel": "release", "country_code": "IT", "counts": 0, "no_clients": 0,
            "no_clients_total": 421}),
    ]
}

pub fn channel_impression_rows() -> Vec<Value> {
    vec![
        json!({"channel": "release", "counts": 100, "duration": "4", "no_clients": 40}),
        json!({"channel": "foo", "counts": 33, "duration": "4", "no_clients": 50}),
        json!({"channel": "nightlyz", "counts": 10, "duration": "5", "no_clients": 30}),
        json!({"channel": "release", "counts": 2, "duration": "6", "no_clients": 20}),
    ]
}
