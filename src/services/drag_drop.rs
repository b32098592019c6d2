//! Drag-and-drop reordering of cards.
//!
//! A gesture runs `Idle -> Dragging -> Dropped -> Reconciled`. On drop the
//! card is placed locally right away, tagged as a [`PendingMove`], and the
//! move is sent to the store. A confirmed move adopts the store's key; a
//! failed one throws away local state and reloads the board.

use std::sync::Arc;

use tokio::sync::Mutex;
use uuid::Uuid;

use crate::api::{Mutation, MutationGateway, ServerState};
use crate::domain::position::{allocate_between, rebalance};
use crate::domain::{EntityId, KanbanError};

use super::board_view::BoardViewModel;
use super::events::{publish, ViewEvent, ViewEvents};
use super::reconcile::{ReconcileTrigger, Reconciler};

/// Vertical extent of a rendered card, in the same coordinates as the pointer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CardRect {
    pub card_id: EntityId,
    pub top: f64,
    pub height: f64,
}

impl CardRect {
    pub fn midpoint(&self) -> f64 {
        self.top + self.height / 2.0
    }
}

/// Index of the first card whose midpoint lies below the pointer, or
/// `rects.len()` to append. `rects` are top to bottom.
pub fn insertion_index(pointer_y: f64, rects: &[CardRect]) -> usize {
    rects
        .iter()
        .position(|r| pointer_y < r.midpoint())
        .unwrap_or(rects.len())
}

#[derive(Debug, Clone, PartialEq)]
pub enum MovePhase {
    Tentative,
    Confirmed { position: i64 },
    Discarded { reason: String },
}

/// One in-flight move, from local placement until the store answers.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingMove {
    pub correlation_id: Uuid,
    pub card_id: EntityId,
    pub from_list: EntityId,
    pub to_list: EntityId,
    pub index: usize,
    pub tentative_position: i64,
    phase: MovePhase,
}

impl PendingMove {
    pub fn new(
        card_id: EntityId,
        from_list: EntityId,
        to_list: EntityId,
        index: usize,
        tentative_position: i64,
    ) -> Self {
        Self {
            correlation_id: Uuid::new_v4(),
            card_id,
            from_list,
            to_list,
            index,
            tentative_position,
            phase: MovePhase::Tentative,
        }
    }

    pub fn phase(&self) -> &MovePhase {
        &self.phase
    }

    pub fn confirm(&mut self, position: i64) -> Result<(), KanbanError> {
        self.settle(MovePhase::Confirmed { position })
    }

    pub fn discard(&mut self, reason: impl Into<String>) -> Result<(), KanbanError> {
        self.settle(MovePhase::Discarded {
            reason: reason.into(),
        })
    }

    fn settle(&mut self, next: MovePhase) -> Result<(), KanbanError> {
        if self.phase != MovePhase::Tentative {
            return Err(KanbanError::PreconditionMissing(format!(
                "move {} already settled as {:?}",
                self.correlation_id, self.phase
            )));
        }
        self.phase = next;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DragState {
    Idle,
    Dragging {
        card_id: EntityId,
        source_list: EntityId,
        hover: Option<(EntityId, usize)>,
    },
    Dropped(PendingMove),
    Reconciled(PendingMove),
}

#[derive(Debug)]
pub enum MoveOutcome {
    Confirmed {
        card_id: EntityId,
        list_id: EntityId,
        position: i64,
    },
    Reverted {
        card_id: EntityId,
        error: KanbanError,
    },
}

pub struct DragDropController {
    board: Arc<BoardViewModel>,
    gateway: MutationGateway,
    reconciler: Reconciler,
    state: Mutex<DragState>,
    events: ViewEvents,
}

impl DragDropController {
    pub fn new(
        board: Arc<BoardViewModel>,
        gateway: MutationGateway,
        reconciler: Reconciler,
        events: ViewEvents,
    ) -> Self {
        Self {
            board,
            gateway,
            reconciler,
            state: Mutex::new(DragState::Idle),
            events,
        }
    }

    pub async fn state(&self) -> DragState {
        self.state.lock().await.clone()
    }

    pub async fn begin_drag(&self, card_id: EntityId) -> Result<(), KanbanError> {
        let snapshot = self.board.snapshot().await;
        let card = snapshot
            .card(card_id)
            .ok_or_else(|| KanbanError::NotFound(format!("card {card_id}")))?;

        *self.state.lock().await = DragState::Dragging {
            card_id,
            source_list: card.list,
            hover: None,
        };
        tracing::debug!(card_id, source_list = card.list, "Drag started");
        Ok(())
    }

    pub async fn cancel_drag(&self) {
        let mut state = self.state.lock().await;
        if matches!(*state, DragState::Dragging { .. }) {
            *state = DragState::Idle;
        }
    }

    /// Records where the card would land in `list_id` for the current pointer.
    pub async fn drag_over(
        &self,
        list_id: EntityId,
        pointer_y: f64,
        rects: &[CardRect],
    ) -> Result<usize, KanbanError> {
        let mut state = self.state.lock().await;
        let DragState::Dragging { card_id, hover, .. } = &mut *state else {
            return Err(KanbanError::PreconditionMissing("no drag in progress".into()));
        };
        let index = Self::index_excluding(*card_id, pointer_y, rects);
        *hover = Some((list_id, index));
        Ok(index)
    }

    fn index_excluding(card_id: EntityId, pointer_y: f64, rects: &[CardRect]) -> usize {
        let others: Vec<CardRect> = rects
            .iter()
            .copied()
            .filter(|r| r.card_id != card_id)
            .collect();
        insertion_index(pointer_y, &others)
    }

    /// Drops the dragged card into `list_id` at the pointer.
    ///
    /// Returns `Reverted` rather than an error when the store refuses the move
    /// or cannot be reached; the board has already been reloaded by then.
    pub async fn drop(
        &self,
        list_id: EntityId,
        pointer_y: f64,
        rects: &[CardRect],
    ) -> Result<MoveOutcome, KanbanError> {
        let (card_id, source_list) = match &*self.state.lock().await {
            DragState::Dragging {
                card_id,
                source_list,
                ..
            } => (*card_id, *source_list),
            _ => return Err(KanbanError::PreconditionMissing("no drag in progress".into())),
        };

        let snapshot = self.board.snapshot().await;
        let target = snapshot
            .list(list_id)
            .ok_or_else(|| KanbanError::NotFound(format!("list {list_id}")))?;
        let siblings: Vec<(EntityId, i64)> = target
            .cards
            .iter()
            .filter(|c| c.id != card_id)
            .map(|c| (c.id, c.position))
            .collect();

        let index = Self::index_excluding(card_id, pointer_y, rects).min(siblings.len());
        let left = index.checked_sub(1).map(|i| siblings[i].1);
        let right = siblings.get(index).map(|s| s.1);

        let mut moves = Vec::new();
        let position = match allocate_between(left, right) {
            Ok(position) => position,
            Err(exhausted) => {
                tracing::info!(list_id, card_id, %exhausted, "Rebalancing list keys");
                let keys = rebalance(siblings.len() + 1);
                let mut order: Vec<EntityId> = siblings.iter().map(|s| s.0).collect();
                order.insert(index, card_id);
                let rekeyed: Vec<(EntityId, i64, i64)> = order
                    .iter()
                    .zip(&keys)
                    .filter(|(id, _)| **id != card_id)
                    .zip(&siblings)
                    .map(|((id, key), (_, old))| (*id, *key, *old))
                    .collect();
                // Raised keys go tail first and lowered keys head first, so a
                // pass that stops partway leaves the store in its old order.
                let raised = rekeyed.iter().rev().filter(|(_, key, old)| key > old);
                let lowered = rekeyed.iter().filter(|(_, key, old)| key < old);
                for (id, key, _) in raised.chain(lowered) {
                    moves.push(Mutation::MoveCard {
                        card: *id,
                        to_list: list_id,
                        position: *key,
                    });
                }
                keys[index]
            }
        };

        let mut pending = PendingMove::new(card_id, source_list, list_id, index, position);
        let placed = self
            .board
            .update(|s| {
                for m in &moves {
                    if let Mutation::MoveCard { card, position, .. } = m {
                        s.set_card_position(*card, *position);
                    }
                }
                s.place_card(card_id, list_id, index, position)
            })
            .await;
        if let Err(e) = placed {
            *self.state.lock().await = DragState::Idle;
            return Err(e);
        }

        *self.state.lock().await = DragState::Dropped(pending.clone());
        tracing::debug!(
            card_id,
            list_id,
            position,
            correlation_id = %pending.correlation_id,
            "Card placed, confirming with store"
        );

        moves.push(Mutation::MoveCard {
            card: card_id,
            to_list: list_id,
            position,
        });

        let outcome = match self.submit_moves(&moves).await {
            Ok(confirmed) => {
                // Settling a fresh pending move cannot fail.
                let _ = pending.confirm(confirmed);
                publish(
                    &self.events,
                    ViewEvent::MoveConfirmed {
                        card_id,
                        list_id,
                        position: confirmed,
                    },
                );
                MoveOutcome::Confirmed {
                    card_id,
                    list_id,
                    position: confirmed,
                }
            }
            Err(error) => {
                let _ = pending.discard(error.to_string());
                tracing::warn!(
                    card_id,
                    correlation_id = %pending.correlation_id,
                    error = %error,
                    "Move failed, reloading board"
                );
                publish(
                    &self.events,
                    ViewEvent::Notice {
                        message: format!("Move failed: {}", error.notice()),
                    },
                );
                self.reconciler
                    .reconcile(&ReconcileTrigger::MutationFailed {
                        card_id: Some(card_id),
                    })
                    .await;
                publish(
                    &self.events,
                    ViewEvent::MoveReverted {
                        card_id,
                        reason: error.notice(),
                    },
                );
                MoveOutcome::Reverted { card_id, error }
            }
        };

        let mut state = self.state.lock().await;
        if matches!(&*state, DragState::Dropped(p) if p.correlation_id == pending.correlation_id) {
            *state = DragState::Reconciled(pending);
        }
        Ok(outcome)
    }

    /// Sends moves in order, adopting each confirmed key. Returns the key of
    /// the last move, which is the dropped card.
    async fn submit_moves(&self, moves: &[Mutation]) -> Result<i64, KanbanError> {
        let mut confirmed = None;
        for mutation in moves {
            let ServerState::Card(card) = self.gateway.submit(mutation).await? else {
                return Err(KanbanError::Rejected {
                    status: 200,
                    message: "move returned something other than a card".into(),
                    details: None,
                });
            };
            self.board
                .update(|s| s.set_card_position(card.id, card.position))
                .await;
            confirmed = Some(card.position);
        }
        confirmed.ok_or_else(|| KanbanError::PreconditionMissing("nothing to move".into()))
    }
}
