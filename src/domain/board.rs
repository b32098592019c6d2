use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::card::{null_as_zero, EntityId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: EntityId,
    pub username: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Board {
    pub id: EntityId,
    pub title: String,
    #[serde(default)]
    pub visibility: Option<String>,
    #[serde(default)]
    pub owner: Option<EntityId>,
    #[serde(default)]
    pub members: Vec<User>,
}

/// Case-insensitive title filter used by the board picker.
pub fn filter_boards<'a>(boards: &'a [Board], query: &str) -> Vec<&'a Board> {
    let query = query.trim().to_lowercase();
    boards
        .iter()
        .filter(|b| query.is_empty() || b.title.to_lowercase().contains(&query))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardList {
    pub id: EntityId,
    pub board: EntityId,
    pub title: String,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub position: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Actor {
    User(User),
    Name(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityLogEntry {
    #[serde(default)]
    pub id: Option<EntityId>,
    #[serde(default, alias = "user")]
    pub actor: Option<Actor>,
    #[serde(alias = "action")]
    pub verb: String,
    #[serde(default, alias = "details")]
    pub payload: Value,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl ActivityLogEntry {
    pub fn actor_name(&self) -> &str {
        match &self.actor {
            Some(Actor::User(user)) => &user.username,
            Some(Actor::Name(name)) => name,
            None => "Unknown",
        }
    }

    pub fn summary(&self) -> String {
        format!("{}: {}", self.actor_name(), self.verb)
    }
}
