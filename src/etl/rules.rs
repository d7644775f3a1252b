//! The classification rule table: the fixed taxonomy mapping raw event
//! signatures onto metric buckets.
//!
//! The table is loaded once at startup (built-in default or a JSON file) and
//! shared read-only afterwards.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::etl::metric::Metric;
use crate::etl::row::EventRow;

pub const EVENT_IMPRESSION: &str = "IMPRESSION";
pub const EVENT_BLOCK: &str = "BLOCK";
pub const EVENT_DISMISS: &str = "DISMISS";
pub const EVENT_CLICK_BUTTON: &str = "CLICK_BUTTON";
pub const EVENT_CLICK: &str = "CLICK";

pub const TEMPLATE_MULTI_SCENE: &str = "multi_scene_snippet";

#[derive(Debug, thiserror::Error)]
pub enum RulesError {
    #[error("failed to read rule table {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse rule table {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid rule table: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyMatch {
    pub key: String,
    pub value: String,
}

/// One row of the taxonomy. A rule matches when the event type is listed and
/// every present constraint (context, property) holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRule {
    pub events: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property: Option<PropertyMatch>,
    pub metric: Metric,
    /// `false` drops matching rows outright.
    #[serde(default = "default_counted")]
    pub counted: bool,
}

fn default_counted() -> bool {
    true
}

/// Bucket for click events no explicit rule claimed, chosen by job template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResidualClickPolicy {
    pub events: Vec<String>,
    pub default: Metric,
    #[serde(default)]
    pub by_template: BTreeMap<String, Metric>,
}

impl ResidualClickPolicy {
    pub fn bucket_for(&self, template: &str) -> Metric {
        self.by_template
            .get(template)
            .copied()
            .unwrap_or(self.default)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOutcome {
    Counted(Metric),
    Ignored,
    Unmatched,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleTable {
    pub rules: Vec<EventRule>,
    pub residual_click: ResidualClickPolicy,
}

impl Default for RuleTable {
    fn default() -> Self {
        let clicks = || vec![EVENT_CLICK_BUTTON.to_string(), EVENT_CLICK.to_string()];
        let direct = |event: &str, metric| EventRule {
            events: vec![event.to_string()],
            context: None,
            property: None,
            metric,
            counted: true,
        };
        let by_context = |context: &str, metric| EventRule {
            events: clicks(),
            context: Some(context.to_string()),
            property: None,
            metric,
            counted: true,
        };

        Self {
            rules: vec![
                direct(EVENT_IMPRESSION, Metric::Impression),
                direct(EVENT_BLOCK, Metric::Block),
                direct(EVENT_DISMISS, Metric::Dismiss),
                EventRule {
                    events: clicks(),
                    context: None,
                    property: Some(PropertyMatch {
                        key: "value".to_string(),
                        value: "scene1-button-learn-more".to_string(),
                    }),
                    metric: Metric::GoToScene2,
                    counted: true,
                },
                by_context("scene1-button-learn-more", Metric::GoToScene2),
                by_context("subscribe-error", Metric::SubscribeError),
                by_context("subscribe-success", Metric::SubscribeSuccess),
                by_context("conversion-subscribe-activation", Metric::Click),
                by_context("EOYSnippetForm", Metric::Click),
            ],
            residual_click: ResidualClickPolicy {
                events: clicks(),
                default: Metric::Click,
                by_template: BTreeMap::from([(
                    TEMPLATE_MULTI_SCENE.to_string(),
                    Metric::OtherClick,
                )]),
            },
        }
    }
}

impl RuleTable {
    /// Built-in table, or the JSON file at `path` when one is configured.
    pub fn load(path: Option<&str>) -> Result<Self, RulesError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let table = Self::from_path(Path::new(path))?;
        tracing::info!(path, rules = table.rules.len(), "Loaded classification rules");
        Ok(table)
    }

    pub fn from_path(path: &Path) -> Result<Self, RulesError> {
        let display = path.display().to_string();
        let raw = std::fs::read_to_string(path).map_err(|source| RulesError::Io {
            path: display.clone(),
            source,
        })?;
        let table: RuleTable = serde_json::from_str(&raw).map_err(|source| RulesError::Parse {
            path: display,
            source,
        })?;
        table.validate()?;
        Ok(table)
    }

    pub fn validate(&self) -> Result<(), RulesError> {
        for (index, rule) in self.rules.iter().enumerate() {
            if rule.events.is_empty() {
                return Err(RulesError::Invalid(format!("rule {index} lists no events")));
            }
        }
        if self.residual_click.events.is_empty() {
            return Err(RulesError::Invalid(
                "residual click policy lists no events".to_string(),
            ));
        }
        Ok(())
    }

    /// Classify one row for a job with the given template. First matching rule wins.
    pub fn classify(&self, row: &EventRow, template: &str) -> RuleOutcome {
        let context = row.context();
        let properties = row.properties();

        for rule in &self.rules {
            if !rule.events.iter().any(|e| e == &row.event) {
                continue;
            }
            if let Some(expected) = rule.context.as_deref() {
                if context != Some(expected) {
                    continue;
                }
            }
            if let Some(prop) = &rule.property {
                if properties.get(&prop.key) != Some(prop.value.as_str()) {
                    continue;
                }
            }
            return if rule.counted {
                RuleOutcome::Counted(rule.metric)
            } else {
                RuleOutcome::Ignored
            };
        }

        if self.residual_click.events.iter().any(|e| e == &row.event) {
            return RuleOutcome::Counted(self.residual_click.bucket_for(template));
        }
        RuleOutcome::Unmatched
    }
}
