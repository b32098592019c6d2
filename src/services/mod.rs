pub mod board_session;
pub mod board_view;
pub mod card_detail;
pub mod drag_drop;
pub mod events;
pub mod realtime;
pub mod reconcile;

pub use board_session::BoardSession;
pub use board_view::{BoardSnapshot, BoardViewModel, ListView};
pub use card_detail::{CardDetail, CardDetailController};
pub use drag_drop::{CardRect, DragDropController, DragState, MoveOutcome, PendingMove};
pub use events::{view_events, ViewEvent, ViewEvents};
pub use realtime::{ChannelStatus, RealtimeChannel, RealtimeHandle};
pub use reconcile::{ReconcileTrigger, Reconciler};
