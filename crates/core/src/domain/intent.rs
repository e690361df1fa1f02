use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Timestamp layout used for `created`/`updated` stamps sent to the backend,
/// e.g. `2017-02-03T10:15:00+01:00`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%:z";

pub fn format_timestamp(at: DateTime<Local>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentExample {
    pub text: String,
    pub created: String,
    pub updated: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentRecord {
    pub intent: String,
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    pub updated: String,
    #[serde(default)]
    pub examples: Vec<IntentExample>,
}

impl IntentRecord {
    /// Record for a brand-new intent. The intent and all of its examples share
    /// one timestamp.
    pub fn new_intent(name: &str, utterances: &[String], stamp: &str) -> Self {
        Self {
            intent: name.to_string(),
            description: None,
            created: Some(stamp.to_string()),
            updated: stamp.to_string(),
            examples: examples_from(utterances, stamp),
        }
    }

    /// Replacement record submitted when updating (and possibly renaming) an
    /// existing intent. Only `updated` is stamped on the intent itself.
    pub fn replacement(name: &str, utterances: &[String], stamp: &str) -> Self {
        Self {
            intent: name.to_string(),
            description: None,
            created: None,
            updated: stamp.to_string(),
            examples: examples_from(utterances, stamp),
        }
    }
}

fn examples_from(utterances: &[String], stamp: &str) -> Vec<IntentExample> {
    utterances
        .iter()
        .map(|text| IntentExample {
            text: text.clone(),
            created: stamp.to_string(),
            updated: stamp.to_string(),
        })
        .collect()
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateIntentRequest {
    pub name: String,
    #[serde(default)]
    pub utterances: Option<Vec<String>>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateIntentRequest {
    pub name: String,
    #[serde(default)]
    pub old_name: Option<String>,
    #[serde(default)]
    pub utterances: Option<Vec<String>>,
}

impl UpdateIntentRequest {
    /// Backend key of the intent being updated: `old_name` when supplied,
    /// otherwise the (unchanged) `name`.
    pub fn lookup_name(&self) -> &str {
        self.old_name.as_deref().filter(|name| !name.is_empty()).unwrap_or(&self.name)
    }
}
