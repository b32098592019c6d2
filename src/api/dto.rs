use serde::Serialize;

use crate::domain::EntityId;

#[derive(Debug, Clone, Serialize)]
pub struct CreateBoardRequest {
    pub title: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateListRequest {
    pub title: String,
    pub board: EntityId,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateCardRequest {
    pub title: String,
    pub list: EntityId,
}

#[derive(Debug, Clone, Serialize)]
pub struct MoveCardRequest {
    pub to_list: EntityId,
    pub position: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateCommentRequest {
    pub card: EntityId,
    pub text: String,
}
