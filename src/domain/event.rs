use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::card::EntityId;
use super::error::KanbanError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    CardMoved,
    CardCreated,
    CommentAdded,
    MemberAdded,
    #[serde(untagged)]
    Other(String),
}

impl NotificationKind {
    pub fn as_str(&self) -> &str {
        match self {
            NotificationKind::CardMoved => "card_moved",
            NotificationKind::CardCreated => "card_created",
            NotificationKind::CommentAdded => "comment_added",
            NotificationKind::MemberAdded => "member_added",
            NotificationKind::Other(kind) => kind,
        }
    }

    /// Kinds that mean board state changed somewhere.
    pub fn is_state_change(&self) -> bool {
        !matches!(self, NotificationKind::Other(_))
    }
}

/// A message received on the board push channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardNotification {
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    #[serde(default, deserialize_with = "flexible_id")]
    pub card: Option<EntityId>,
}

impl BoardNotification {
    pub fn parse(text: &str) -> Result<Self, KanbanError> {
        serde_json::from_str(text).map_err(|e| KanbanError::MalformedNotification(e.to_string()))
    }

    pub fn references_card(&self, card_id: EntityId) -> bool {
        self.card == Some(card_id)
    }
}

/// Card ids arrive either as JSON numbers or as numeric strings.
fn flexible_id<'de, D>(deserializer: D) -> Result<Option<EntityId>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("card id out of range: {n}"))),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("invalid card id: {s}"))),
        Some(other) => Err(D::Error::custom(format!("invalid card id: {other}"))),
    }
}
