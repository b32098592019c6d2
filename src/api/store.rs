use crate::domain::{ActivityLogEntry, Board, BoardList, Card, Comment, EntityId, KanbanError};

use super::StoreClient;

/// Read side of the remote store. Collections come back unfiltered; callers
/// narrow them to the board or card they show.
#[derive(Clone, Debug)]
pub struct RemoteStore {
    client: StoreClient,
}

impl RemoteStore {
    pub fn new(client: StoreClient) -> Self {
        Self { client }
    }

    pub async fn boards(&self) -> Result<Vec<Board>, KanbanError> {
        self.client.get_json("/api/boards/").await
    }

    pub async fn lists(&self) -> Result<Vec<BoardList>, KanbanError> {
        self.client.get_json("/api/lists/").await
    }

    pub async fn cards(&self) -> Result<Vec<Card>, KanbanError> {
        self.client.get_json("/api/cards/").await
    }

    pub async fn card(&self, card_id: EntityId) -> Result<Card, KanbanError> {
        self.client
            .get_json(&format!("/api/cards/{card_id}/"))
            .await
            .map_err(|e| match e {
                KanbanError::Rejected { status: 404, .. } => {
                    KanbanError::NotFound(format!("card {card_id}"))
                }
                other => other,
            })
    }

    pub async fn comments(&self) -> Result<Vec<Comment>, KanbanError> {
        self.client.get_json("/api/comments/").await
    }

    pub async fn activity(&self, board_id: EntityId) -> Result<Vec<ActivityLogEntry>, KanbanError> {
        self.client
            .get_json(&format!("/api/activity/?board={board_id}"))
            .await
    }
}
