use std::fmt;

use serde::{Deserialize, Serialize};

/// A counter in the fixed metric taxonomy.
///
/// Declaration order is the stable sort order of detail entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Metric {
    #[serde(rename = "impression")]
    Impression,
    #[serde(rename = "click")]
    Click,
    #[serde(rename = "block")]
    Block,
    #[serde(rename = "dismiss")]
    Dismiss,
    #[serde(rename = "go_to_scene2")]
    GoToScene2,
    #[serde(rename = "subscribe_error")]
    SubscribeError,
    #[serde(rename = "subscribe_success")]
    SubscribeSuccess,
    #[serde(rename = "other_click")]
    OtherClick,
}

impl Metric {
    pub const ALL: [Metric; 8] = [
        Metric::Impression,
        Metric::Click,
        Metric::Block,
        Metric::Dismiss,
        Metric::GoToScene2,
        Metric::SubscribeError,
        Metric::SubscribeSuccess,
        Metric::OtherClick,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Impression => "impression",
            Self::Click => "click",
            Self::Block => "block",
            Self::Dismiss => "dismiss",
            Self::GoToScene2 => "go_to_scene2",
            Self::SubscribeError => "subscribe_error",
            Self::SubscribeSuccess => "subscribe_success",
            Self::OtherClick => "other_click",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
