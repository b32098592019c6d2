use std::sync::Arc;

use crate::domain::{BoardNotification, EntityId};

use super::board_view::BoardViewModel;
use super::card_detail::CardDetailController;

/// Why client state is being brought back in line with the store.
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileTrigger {
    Notification(BoardNotification),
    MutationFailed { card_id: Option<EntityId> },
    Manual,
}

/// Brings cached state back in line with the store.
///
/// The current strategy refetches everything for every trigger. Callers only
/// see `reconcile`, so a patch-applying strategy can replace it later.
#[derive(Debug, Clone)]
pub struct Reconciler {
    board: Arc<BoardViewModel>,
    detail: Arc<CardDetailController>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub board_reloaded: bool,
    pub detail_reloaded: bool,
}

impl Reconciler {
    pub fn new(board: Arc<BoardViewModel>, detail: Arc<CardDetailController>) -> Self {
        Self { board, detail }
    }

    pub async fn reconcile(&self, trigger: &ReconcileTrigger) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        let detail_card = match trigger {
            ReconcileTrigger::Notification(notification) => {
                if !notification.kind.is_state_change() {
                    tracing::debug!(
                        kind = notification.kind.as_str(),
                        "Ignoring unrecognized notification"
                    );
                    return report;
                }
                notification.card
            }
            ReconcileTrigger::MutationFailed { .. } | ReconcileTrigger::Manual => None,
        };

        tracing::debug!(board_id = self.board.board_id(), ?trigger, "Reconciling board");
        report.board_reloaded = self.board.reload().await.is_ok();
        self.board.reload_activity().await;

        if let Some(card_id) = detail_card {
            report.detail_reloaded = self.detail.reload_if_showing(card_id).await;
        }
        report
    }
}
