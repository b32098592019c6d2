use crate::domain::{Board, BoardList, Card, Comment, EntityId, KanbanError};

use super::dto::{
    CreateBoardRequest, CreateCardRequest, CreateCommentRequest, CreateListRequest,
    MoveCardRequest,
};
use super::StoreClient;

#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    CreateBoard { title: String },
    CreateList { board: EntityId, title: String },
    CreateCard { list: EntityId, title: String },
    MoveCard { card: EntityId, to_list: EntityId, position: i64 },
    PostComment { card: EntityId, text: String },
}

impl Mutation {
    pub fn name(&self) -> &'static str {
        match self {
            Mutation::CreateBoard { .. } => "create_board",
            Mutation::CreateList { .. } => "create_list",
            Mutation::CreateCard { .. } => "create_card",
            Mutation::MoveCard { .. } => "move_card",
            Mutation::PostComment { .. } => "post_comment",
        }
    }
}

/// The store's view of the entity a mutation touched.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerState {
    Board(Board),
    List(BoardList),
    Card(Card),
    Comment(Comment),
}

/// Sends one request per mutation and reports how it went.
///
/// Failures are `NetworkUnavailable` or `Rejected`; there is no retry here.
/// Applying the returned state is up to the caller.
#[derive(Clone, Debug)]
pub struct MutationGateway {
    client: StoreClient,
}

impl MutationGateway {
    pub fn new(client: StoreClient) -> Self {
        Self { client }
    }

    pub async fn submit(&self, mutation: &Mutation) -> Result<ServerState, KanbanError> {
        let result = match mutation {
            Mutation::CreateBoard { title } => self
                .client
                .post_json("/api/boards/", &CreateBoardRequest { title: title.clone() })
                .await
                .map(ServerState::Board),
            Mutation::CreateList { board, title } => self
                .client
                .post_json(
                    "/api/lists/",
                    &CreateListRequest {
                        title: title.clone(),
                        board: *board,
                    },
                )
                .await
                .map(ServerState::List),
            Mutation::CreateCard { list, title } => self
                .client
                .post_json(
                    "/api/cards/",
                    &CreateCardRequest {
                        title: title.clone(),
                        list: *list,
                    },
                )
                .await
                .map(ServerState::Card),
            Mutation::MoveCard {
                card,
                to_list,
                position,
            } => self
                .client
                .post_json(
                    &format!("/api/cards/{card}/move/"),
                    &MoveCardRequest {
                        to_list: *to_list,
                        position: *position,
                    },
                )
                .await
                .map(ServerState::Card),
            Mutation::PostComment { card, text } => self
                .client
                .post_json(
                    "/api/comments/",
                    &CreateCommentRequest {
                        card: *card,
                        text: text.clone(),
                    },
                )
                .await
                .map(ServerState::Comment),
        };

        match &result {
            Ok(_) => tracing::debug!(mutation = mutation.name(), "Mutation accepted"),
            Err(e) => tracing::warn!(mutation = mutation.name(), error = %e, "Mutation failed"),
        }
        result
    }
}
