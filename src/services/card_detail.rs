use std::time::Duration;

use serde::Serialize;
use tokio::sync::RwLock;

use crate::api::{Mutation, MutationGateway, RemoteStore};
use crate::domain::{Card, Comment, EntityId, KanbanError};

use super::events::{publish, ViewEvent, ViewEvents};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardDetail {
    pub card: Card,
    /// Oldest first.
    pub comments: Vec<Comment>,
}

/// The single-card view with its comment thread.
#[derive(Debug)]
pub struct CardDetailController {
    store: RemoteStore,
    gateway: MutationGateway,
    settle_delay: Duration,
    open: RwLock<Option<CardDetail>>,
    events: ViewEvents,
}

impl CardDetailController {
    pub fn new(
        store: RemoteStore,
        gateway: MutationGateway,
        settle_delay: Duration,
        events: ViewEvents,
    ) -> Self {
        Self {
            store,
            gateway,
            settle_delay,
            open: RwLock::new(None),
            events,
        }
    }

    async fn load(&self, card_id: EntityId) -> Result<CardDetail, KanbanError> {
        let card = self.store.card(card_id).await.inspect_err(|e| {
            tracing::warn!(card_id, error = %e, "Failed loading card");
            publish(
                &self.events,
                ViewEvent::Notice {
                    message: format!("Failed loading card: {}", e.notice()),
                },
            );
        })?;

        let comments = match self.store.comments().await {
            Ok(all) => {
                let mut comments: Vec<Comment> =
                    all.into_iter().filter(|c| c.card == card_id).collect();
                comments.sort_by_key(|c| c.created_at);
                comments
            }
            Err(e) => {
                tracing::debug!(card_id, error = %e, "Comments unavailable, showing none");
                Vec::new()
            }
        };

        Ok(CardDetail { card, comments })
    }

    pub async fn open(&self, card_id: EntityId) -> Result<CardDetail, KanbanError> {
        let detail = self.load(card_id).await?;
        *self.open.write().await = Some(detail.clone());
        publish(
            &self.events,
            ViewEvent::CardDetailReloaded {
                card_id,
                comments: detail.comments.len(),
            },
        );
        Ok(detail)
    }

    pub async fn close(&self) {
        *self.open.write().await = None;
    }

    pub async fn current(&self) -> Option<CardDetail> {
        self.open.read().await.clone()
    }

    pub async fn open_card_id(&self) -> Option<EntityId> {
        self.open.read().await.as_ref().map(|d| d.card.id)
    }

    /// Reloads the view if it is still showing `card_id`.
    pub async fn reload_if_showing(&self, card_id: EntityId) -> bool {
        if self.open_card_id().await != Some(card_id) {
            return false;
        }
        let detail = match self.load(card_id).await {
            Ok(detail) => detail,
            Err(_) => return false,
        };

        let mut open = self.open.write().await;
        if open.as_ref().map(|d| d.card.id) != Some(card_id) {
            return false;
        }
        let comments = detail.comments.len();
        *open = Some(detail);
        drop(open);

        publish(&self.events, ViewEvent::CardDetailReloaded { card_id, comments });
        true
    }

    /// Posts to the open card, waits for the store to settle, then re-reads
    /// the whole detail view. Blank text is ignored. Returns `None` when a
    /// different card was opened while waiting.
    pub async fn post_comment(&self, text: &str) -> Result<Option<CardDetail>, KanbanError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }
        let card_id = self
            .open_card_id()
            .await
            .ok_or_else(|| KanbanError::PreconditionMissing("no card is open".into()))?;

        let mutation = Mutation::PostComment {
            card: card_id,
            text: text.to_string(),
        };
        if let Err(e) = self.gateway.submit(&mutation).await {
            publish(
                &self.events,
                ViewEvent::Notice {
                    message: format!("Comment failed: {}", e.notice()),
                },
            );
            return Err(e);
        }

        tokio::time::sleep(self.settle_delay).await;
        if !self.reload_if_showing(card_id).await {
            return Ok(None);
        }
        Ok(self
            .current()
            .await
            .filter(|detail| detail.card.id == card_id))
    }
}
