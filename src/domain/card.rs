use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::board::User;

pub type EntityId = i64;

/// Stored positions may be null on older rows; they order as 0.
pub(crate) fn null_as_zero<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<i64>::deserialize(deserializer)?.unwrap_or(0))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: EntityId,
    pub list: EntityId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub position: i64,
    #[serde(default)]
    pub labels: Vec<Value>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
}

impl Card {
    /// Labels are free-form JSON in the store; plain strings are used as-is,
    /// anything else is rendered as JSON text.
    pub fn label_texts(&self) -> Vec<String> {
        self.labels
            .iter()
            .map(|label| match label {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect()
    }

    pub fn matches(&self, term: &str) -> bool {
        let term = term.to_lowercase();
        self.title.to_lowercase().contains(&term)
            || self
                .label_texts()
                .iter()
                .any(|label| label.to_lowercase().contains(&term))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: EntityId,
    pub card: EntityId,
    #[serde(default)]
    pub author: Option<User>,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn author_name(&self) -> &str {
        self.author
            .as_ref()
            .map(|u| u.username.as_str())
            .unwrap_or("Unknown")
    }
}
