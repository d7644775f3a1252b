//! Typed views of the rows returned by the analytics query service.
//!
//! Rows are decoded one at a time; a row that fails to decode is skipped by
//! the caller, it never aborts a run.

use std::collections::BTreeMap;

use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::Value;

/// One row of the job events / impression totals reports.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EventRow {
    #[serde(rename = "message_id", deserialize_with = "de_u64")]
    pub job_id: u64,
    #[serde(default)]
    pub event: String,
    #[serde(default, deserialize_with = "de_string")]
    pub event_context: String,
    #[serde(default)]
    pub additional_properties: Option<Value>,
    #[serde(default, deserialize_with = "de_string")]
    pub channel: String,
    #[serde(default, deserialize_with = "de_string")]
    pub country_code: String,
    #[serde(default, deserialize_with = "de_u64")]
    pub counts: u64,
    #[serde(default, deserialize_with = "de_u64")]
    pub no_clients: u64,
    #[serde(default, deserialize_with = "de_u64")]
    pub no_clients_total: u64,
}

impl EventRow {
    pub fn from_value(value: Value) -> Option<Self> {
        match serde_json::from_value(value) {
            Ok(row) => Some(row),
            Err(e) => {
                tracing::debug!(error = %e, "Skipping undecodable event row");
                None
            }
        }
    }

    /// Context with the service's empty placeholders (`""`, `"{}"`) mapped to `None`.
    pub fn context(&self) -> Option<&str> {
        match self.event_context.trim() {
            "" | "{}" => None,
            other => Some(other),
        }
    }

    pub fn properties(&self) -> AdditionalProperties {
        AdditionalProperties::parse(self.additional_properties.as_ref())
    }
}

/// One row of the channel impressions report.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ImpressionRow {
    #[serde(default, deserialize_with = "de_string")]
    pub channel: String,
    #[serde(default, deserialize_with = "de_string")]
    pub duration: String,
    #[serde(default, deserialize_with = "de_u64")]
    pub counts: u64,
    #[serde(default, deserialize_with = "de_u64")]
    pub no_clients: u64,
}

impl ImpressionRow {
    pub fn from_value(value: Value) -> Option<Self> {
        match serde_json::from_value(value) {
            Ok(row) => Some(row),
            Err(e) => {
                tracing::debug!(error = %e, "Skipping undecodable impression row");
                None
            }
        }
    }
}

/// Structured `additional_properties` payload.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AdditionalProperties {
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(flatten)]
    pub other: BTreeMap<String, Value>,
}

impl AdditionalProperties {
    /// Accepts a JSON-encoded string or an already decoded object. Anything
    /// else, including malformed JSON, yields empty properties.
    pub fn parse(raw: Option<&Value>) -> Self {
        let parsed = match raw {
            Some(Value::String(text)) if !text.trim().is_empty() => {
                serde_json::from_str::<AdditionalProperties>(text)
            }
            Some(obj @ Value::Object(_)) => {
                serde_json::from_value::<AdditionalProperties>(obj.clone())
            }
            _ => return Self::default(),
        };
        parsed.unwrap_or_else(|e| {
            tracing::debug!(error = %e, "Ignoring malformed additional_properties");
            Self::default()
        })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        match key {
            "value" => self.value.as_deref(),
            "source" => self.source.as_deref(),
            other => self.other.get(other).and_then(Value::as_str),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_none() && self.source.is_none() && self.other.is_empty()
    }
}

/// Numbers, numeric strings, and `null` (as 0).
fn de_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(0),
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0 && f.fract() == 0.0).map(|f| f as u64))
            .ok_or_else(|| de::Error::custom(format!("expected a non-negative integer, got {n}"))),
        Value::String(s) => s
            .trim()
            .parse::<u64>()
            .map_err(|_| de::Error::custom(format!("expected a numeric string, got {s:?}"))),
        other => Err(de::Error::custom(format!(
            "expected a number or numeric string, got {other}"
        ))),
    }
}

/// Strings, numbers (stringified), and `null` (as empty).
fn de_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(de::Error::custom(format!("expected a string, got {other}"))),
    }
}
