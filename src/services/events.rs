use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::domain::EntityId;

/// Things a front end reacts to: refreshed state, notices, channel status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ViewEvent {
    BoardReloaded { board_id: EntityId, lists: usize, cards: usize },
    ActivityReloaded { board_id: EntityId, entries: usize },
    CardDetailReloaded { card_id: EntityId, comments: usize },
    MoveConfirmed { card_id: EntityId, list_id: EntityId, position: i64 },
    MoveReverted { card_id: EntityId, reason: String },
    Notice { message: String },
    ChannelLive { board_id: EntityId },
    ChannelClosed { board_id: EntityId },
}

pub type ViewEvents = broadcast::Sender<ViewEvent>;

pub fn view_events() -> ViewEvents {
    let (tx, _rx) = broadcast::channel(256);
    tx
}

/// Publishing with no subscriber is fine; a headless session may not listen.
pub(crate) fn publish(events: &ViewEvents, event: ViewEvent) {
    let _ = events.send(event);
}
