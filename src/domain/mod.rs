pub mod board;
pub mod card;
pub mod error;
pub mod event;
pub mod position;

pub use board::{filter_boards, ActivityLogEntry, Actor, Board, BoardList, User};
pub use card::{Card, Comment, EntityId};
pub use error::KanbanError;
pub use event::{BoardNotification, NotificationKind};
pub use position::{allocate, allocate_between, rebalance, KeySpaceExhausted};
