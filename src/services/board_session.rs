use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::api::{MutationGateway, RemoteStore, StoreClient};
use crate::auth::SessionContext;
use crate::config::Config;
use crate::domain::{BoardNotification, EntityId, KanbanError};

use super::board_view::BoardViewModel;
use super::card_detail::CardDetailController;
use super::drag_drop::DragDropController;
use super::events::{ViewEvent, ViewEvents};
use super::realtime::{ChannelStatus, RealtimeChannel, RealtimeHandle};
use super::reconcile::{ReconcileTrigger, Reconciler};

/// Everything behind one open board view. Dropping out of the view means
/// calling [`BoardSession::close`], which stops the push channel.
pub struct BoardSession {
    pub board: Arc<BoardViewModel>,
    pub detail: Arc<CardDetailController>,
    pub drag: DragDropController,
    pub gateway: MutationGateway,
    reconciler: Reconciler,
    events: ViewEvents,
    cancel: CancellationToken,
    channel: RealtimeHandle,
    pump: JoinHandle<()>,
}

impl BoardSession {
    pub async fn open(
        session: SessionContext,
        config: &Config,
        board_id: Option<EntityId>,
        events: ViewEvents,
    ) -> Result<Self, KanbanError> {
        let board_id = board_id
            .ok_or_else(|| KanbanError::PreconditionMissing("board id".into()))?;
        session.bearer()?;
        let push_url = session.push_url(board_id)?;

        let http = config
            .http_client()
            .map_err(|e| KanbanError::Config(e.to_string()))?;
        let client = StoreClient::new(http, session);
        let store = RemoteStore::new(client.clone());
        let gateway = MutationGateway::new(client);

        let board = Arc::new(BoardViewModel::new(
            board_id,
            store.clone(),
            gateway.clone(),
            events.clone(),
        ));
        let detail = Arc::new(CardDetailController::new(
            store,
            gateway.clone(),
            config.comment_settle_delay,
            events.clone(),
        ));
        let reconciler = Reconciler::new(Arc::clone(&board), Arc::clone(&detail));
        let drag = DragDropController::new(
            Arc::clone(&board),
            gateway.clone(),
            reconciler.clone(),
            events.clone(),
        );

        if let Err(e) = board.reload().await {
            tracing::warn!(board_id, error = %e, "Initial board load failed, waiting for updates");
        }
        board.reload_activity().await;

        let cancel = CancellationToken::new();
        let (tx, rx) = mpsc::unbounded_channel();
        let channel = RealtimeChannel::spawn(
            board_id,
            push_url,
            config.reconnect_delay,
            tx,
            events.clone(),
            cancel.child_token(),
        );
        let pump = tokio::spawn(Self::pump(rx, reconciler.clone(), cancel.child_token()));

        tracing::info!(board_id, "Board session opened");
        Ok(Self {
            board,
            detail,
            drag,
            gateway,
            reconciler,
            events,
            cancel,
            channel,
            pump,
        })
    }

    async fn pump(
        mut notifications: mpsc::UnboundedReceiver<BoardNotification>,
        reconciler: Reconciler,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                next = notifications.recv() => match next {
                    Some(notification) => {
                        reconciler
                            .reconcile(&ReconcileTrigger::Notification(notification))
                            .await;
                    }
                    None => break,
                },
            }
        }
    }

    pub fn board_id(&self) -> EntityId {
        self.board.board_id()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ViewEvent> {
        self.events.subscribe()
    }

    pub fn channel_status(&self) -> watch::Receiver<ChannelStatus> {
        self.channel.status()
    }

    pub fn channel_attempts(&self) -> u64 {
        self.channel.attempts()
    }

    /// Full reload on demand, e.g. a refresh button.
    pub async fn refresh(&self) {
        self.reconciler.reconcile(&ReconcileTrigger::Manual).await;
    }

    pub async fn close(self) {
        let board_id = self.board_id();
        self.cancel.cancel();
        self.channel.stop().await;
        if let Err(e) = self.pump.await {
            tracing::warn!(board_id, error = %e, "Notification pump ended abnormally");
        }
        self.detail.close().await;
        tracing::info!(board_id, "Board session closed");
    }
}
