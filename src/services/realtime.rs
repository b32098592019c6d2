use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use crate::domain::{BoardNotification, EntityId, KanbanError};

use super::events::{publish, ViewEvent, ViewEvents};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelStatus {
    Connecting,
    Live,
    Closed,
    Stopped,
}

/// Receive-only push subscription for one board.
///
/// Reconnects after a fixed delay for as long as it runs; only cancellation
/// stops it. Payloads that fail to parse are logged and dropped.
pub struct RealtimeChannel {
    board_id: EntityId,
    url: String,
    reconnect_delay: Duration,
    notifications: mpsc::UnboundedSender<BoardNotification>,
    status: watch::Sender<ChannelStatus>,
    attempts: Arc<AtomicU64>,
    events: ViewEvents,
    cancel: CancellationToken,
}

pub struct RealtimeHandle {
    status: watch::Receiver<ChannelStatus>,
    attempts: Arc<AtomicU64>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl RealtimeHandle {
    pub fn status(&self) -> watch::Receiver<ChannelStatus> {
        self.status.clone()
    }

    /// Connection attempts made so far, including the first.
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }

    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "Push channel task ended abnormally");
        }
    }
}

impl RealtimeChannel {
    pub fn spawn(
        board_id: EntityId,
        url: String,
        reconnect_delay: Duration,
        notifications: mpsc::UnboundedSender<BoardNotification>,
        events: ViewEvents,
        cancel: CancellationToken,
    ) -> RealtimeHandle {
        let (status, status_rx) = watch::channel(ChannelStatus::Connecting);
        let attempts = Arc::new(AtomicU64::new(0));
        let channel = Self {
            board_id,
            url,
            reconnect_delay,
            notifications,
            status,
            attempts: Arc::clone(&attempts),
            events,
            cancel: cancel.clone(),
        };
        let task = tokio::spawn(channel.run());
        RealtimeHandle {
            status: status_rx,
            attempts,
            cancel,
            task,
        }
    }

    async fn run(self) {
        loop {
            self.status.send_replace(ChannelStatus::Connecting);
            self.attempts.fetch_add(1, Ordering::Relaxed);

            tokio::select! {
                _ = self.cancel.cancelled() => break,
                result = self.connect_and_listen() => match result {
                    Ok(()) => tracing::info!(
                        board_id = self.board_id,
                        "Push channel closed, reconnecting in {:?}",
                        self.reconnect_delay
                    ),
                    Err(e) => tracing::warn!(
                        board_id = self.board_id,
                        error = %e,
                        "Push channel error, reconnecting in {:?}",
                        self.reconnect_delay
                    ),
                },
            }

            self.status.send_replace(ChannelStatus::Closed);
            publish(
                &self.events,
                ViewEvent::ChannelClosed {
                    board_id: self.board_id,
                },
            );

            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(self.reconnect_delay) => {}
            }
        }

        self.status.send_replace(ChannelStatus::Stopped);
        tracing::info!(board_id = self.board_id, "Push channel stopped");
    }

    async fn connect_and_listen(&self) -> Result<(), KanbanError> {
        tracing::debug!(url = self.url.as_str(), "Connecting push channel");
        let (mut socket, _response) = tokio_tungstenite::connect_async(self.url.as_str())
            .await
            .map_err(|e| KanbanError::NetworkUnavailable(e.to_string()))?;

        self.status.send_replace(ChannelStatus::Live);
        publish(
            &self.events,
            ViewEvent::ChannelLive {
                board_id: self.board_id,
            },
        );
        tracing::info!(board_id = self.board_id, "Push channel live");

        while let Some(frame) = socket.next().await {
            match frame {
                Ok(Message::Text(text)) => self.dispatch(text.as_str()),
                Ok(Message::Close(frame)) => {
                    tracing::debug!(board_id = self.board_id, ?frame, "Push channel close frame");
                    break;
                }
                Ok(_) => {}
                Err(e) => return Err(KanbanError::NetworkUnavailable(e.to_string())),
            }
        }
        Ok(())
    }

    fn dispatch(&self, text: &str) {
        match BoardNotification::parse(text) {
            Ok(notification) => {
                tracing::debug!(
                    board_id = self.board_id,
                    kind = notification.kind.as_str(),
                    card = ?notification.card,
                    "Push notification"
                );
                if self.notifications.send(notification).is_err() {
                    tracing::debug!(board_id = self.board_id, "No listener for push notifications");
                }
            }
            Err(e) => {
                tracing::warn!(
                    board_id = self.board_id,
                    error = %e,
                    raw = text,
                    "Ignoring malformed push payload"
                );
            }
        }
    }
}
