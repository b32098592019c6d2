use serde::Serialize;
use tokio::sync::RwLock;

use crate::api::{Mutation, MutationGateway, RemoteStore, ServerState};
use crate::domain::{ActivityLogEntry, Board, BoardList, Card, EntityId, KanbanError};

use super::events::{publish, ViewEvent, ViewEvents};

pub const DEFAULT_TITLE: &str = "Board";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListView {
    pub list: BoardList,
    pub cards: Vec<Card>,
}

impl ListView {
    pub fn card_ids(&self) -> Vec<EntityId> {
        self.cards.iter().map(|c| c.id).collect()
    }

    pub fn position_of(&self, card_id: EntityId) -> Option<i64> {
        self.cards.iter().find(|c| c.id == card_id).map(|c| c.position)
    }
}

/// Lists of one board in position order, each with its cards in position
/// order. Rebuilt from scratch on every reload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoardSnapshot {
    pub board_id: EntityId,
    pub title: String,
    pub lists: Vec<ListView>,
}

impl BoardSnapshot {
    pub fn empty(board_id: EntityId) -> Self {
        Self {
            board_id,
            title: DEFAULT_TITLE.to_string(),
            lists: Vec::new(),
        }
    }

    /// Builds the board from unfiltered store collections. Sorting is stable,
    /// so equal positions keep the order the store returned them in.
    pub fn assemble(
        board_id: EntityId,
        title: String,
        lists: Vec<BoardList>,
        cards: Vec<Card>,
    ) -> Self {
        let mut lists: Vec<BoardList> = lists.into_iter().filter(|l| l.board == board_id).collect();
        lists.sort_by_key(|l| l.position);

        let mut views: Vec<ListView> = lists
            .into_iter()
            .map(|list| ListView {
                list,
                cards: Vec::new(),
            })
            .collect();

        for card in cards {
            if let Some(view) = views.iter_mut().find(|v| v.list.id == card.list) {
                view.cards.push(card);
            }
        }
        for view in &mut views {
            view.cards.sort_by_key(|c| c.position);
        }

        Self {
            board_id,
            title,
            lists: views,
        }
    }

    pub fn list(&self, list_id: EntityId) -> Option<&ListView> {
        self.lists.iter().find(|v| v.list.id == list_id)
    }

    pub fn card(&self, card_id: EntityId) -> Option<&Card> {
        self.lists
            .iter()
            .flat_map(|v| v.cards.iter())
            .find(|c| c.id == card_id)
    }

    pub fn card_count(&self) -> usize {
        self.lists.iter().map(|v| v.cards.len()).sum()
    }

    /// Takes a card out of whichever list holds it.
    fn take_card(&mut self, card_id: EntityId) -> Option<Card> {
        for view in &mut self.lists {
            if let Some(index) = view.cards.iter().position(|c| c.id == card_id) {
                return Some(view.cards.remove(index));
            }
        }
        None
    }

    /// Places a card at `index` of `to_list` with a not yet confirmed key.
    pub fn place_card(
        &mut self,
        card_id: EntityId,
        to_list: EntityId,
        index: usize,
        position: i64,
    ) -> Result<(), KanbanError> {
        if self.list(to_list).is_none() {
            return Err(KanbanError::NotFound(format!("list {to_list}")));
        }
        let mut card = self
            .take_card(card_id)
            .ok_or_else(|| KanbanError::NotFound(format!("card {card_id}")))?;
        card.list = to_list;
        card.position = position;

        let view = self
            .lists
            .iter_mut()
            .find(|v| v.list.id == to_list)
            .ok_or_else(|| KanbanError::NotFound(format!("list {to_list}")))?;
        let index = index.min(view.cards.len());
        view.cards.insert(index, card);
        Ok(())
    }

    /// Records the key the store settled on. The card keeps its slot.
    pub fn set_card_position(&mut self, card_id: EntityId, position: i64) -> bool {
        for view in &mut self.lists {
            if let Some(card) = view.cards.iter_mut().find(|c| c.id == card_id) {
                card.position = position;
                return true;
            }
        }
        false
    }
}

/// Holds the board currently on screen and knows how to rebuild it.
#[derive(Debug)]
pub struct BoardViewModel {
    board_id: EntityId,
    store: RemoteStore,
    gateway: MutationGateway,
    state: RwLock<BoardSnapshot>,
    activity: RwLock<Vec<ActivityLogEntry>>,
    events: ViewEvents,
}

impl BoardViewModel {
    pub fn new(
        board_id: EntityId,
        store: RemoteStore,
        gateway: MutationGateway,
        events: ViewEvents,
    ) -> Self {
        Self {
            board_id,
            store,
            gateway,
            state: RwLock::new(BoardSnapshot::empty(board_id)),
            activity: RwLock::new(Vec::new()),
            events,
        }
    }

    pub fn board_id(&self) -> EntityId {
        self.board_id
    }

    pub fn events(&self) -> &ViewEvents {
        &self.events
    }

    pub async fn snapshot(&self) -> BoardSnapshot {
        self.state.read().await.clone()
    }

    pub async fn activity(&self) -> Vec<ActivityLogEntry> {
        self.activity.read().await.clone()
    }

    /// Applies a local change to the cached board.
    pub async fn update<R>(&self, f: impl FnOnce(&mut BoardSnapshot) -> R) -> R {
        let mut state = self.state.write().await;
        f(&mut state)
    }

    async fn fetch_title(&self, boards: Result<Vec<Board>, KanbanError>) -> String {
        match boards {
            Ok(boards) => boards
                .into_iter()
                .find(|b| b.id == self.board_id)
                .map(|b| b.title)
                .unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            Err(e) => {
                tracing::debug!(board_id = self.board_id, error = %e, "Board title unavailable, keeping previous");
                self.state.read().await.title.clone()
            }
        }
    }

    /// Fetches lists and cards and replaces the cached board wholesale.
    pub async fn reload(&self) -> Result<BoardSnapshot, KanbanError> {
        let (boards, lists, cards) =
            tokio::join!(self.store.boards(), self.store.lists(), self.store.cards());
        let title = self.fetch_title(boards).await;

        let (lists, cards) = match (lists, cards) {
            (Ok(lists), Ok(cards)) => (lists, cards),
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!(board_id = self.board_id, error = %e, "Board reload failed");
                publish(
                    &self.events,
                    ViewEvent::Notice {
                        message: format!("Could not load board: {}", e.notice()),
                    },
                );
                return Err(e);
            }
        };

        let snapshot = BoardSnapshot::assemble(self.board_id, title, lists, cards);
        *self.state.write().await = snapshot.clone();

        tracing::debug!(
            board_id = self.board_id,
            lists = snapshot.lists.len(),
            cards = snapshot.card_count(),
            "Board reloaded"
        );
        publish(
            &self.events,
            ViewEvent::BoardReloaded {
                board_id: self.board_id,
                lists: snapshot.lists.len(),
                cards: snapshot.card_count(),
            },
        );
        Ok(snapshot)
    }

    /// The activity panel is non-critical; failures leave it as it was.
    pub async fn reload_activity(&self) {
        match self.store.activity(self.board_id).await {
            Ok(entries) => {
                let count = entries.len();
                *self.activity.write().await = entries;
                publish(
                    &self.events,
                    ViewEvent::ActivityReloaded {
                        board_id: self.board_id,
                        entries: count,
                    },
                );
            }
            Err(e) => {
                tracing::debug!(board_id = self.board_id, error = %e, "Skipping activity reload");
            }
        }
    }

    pub async fn create_list(&self, title: &str) -> Result<Option<BoardList>, KanbanError> {
        let title = title.trim();
        if title.is_empty() {
            return Ok(None);
        }
        let mutation = Mutation::CreateList {
            board: self.board_id,
            title: title.to_string(),
        };
        match self.submit_and_reload(&mutation, "Create list failed").await? {
            ServerState::List(list) => Ok(Some(list)),
            _ => Ok(None),
        }
    }

    pub async fn create_card(
        &self,
        list_id: EntityId,
        title: &str,
    ) -> Result<Option<Card>, KanbanError> {
        let title = title.trim();
        if title.is_empty() {
            return Ok(None);
        }
        let mutation = Mutation::CreateCard {
            list: list_id,
            title: title.to_string(),
        };
        match self.submit_and_reload(&mutation, "Create card failed").await? {
            ServerState::Card(card) => Ok(Some(card)),
            _ => Ok(None),
        }
    }

    async fn submit_and_reload(
        &self,
        mutation: &Mutation,
        failure_notice: &str,
    ) -> Result<ServerState, KanbanError> {
        match self.gateway.submit(mutation).await {
            Ok(state) => {
                // Reload failures already raised their own notice.
                let _ = self.reload().await;
                Ok(state)
            }
            Err(e) => {
                publish(
                    &self.events,
                    ViewEvent::Notice {
                        message: format!("{failure_notice}: {}", e.notice()),
                    },
                );
                Err(e)
            }
        }
    }

    /// Cards of this board whose title or a label contains `term`.
    ///
    /// Reads fresh lists and cards rather than the cached board.
    pub async fn search(&self, term: &str) -> Result<Vec<Card>, KanbanError> {
        let term = term.trim();
        let (lists, cards) = tokio::try_join!(self.store.lists(), self.store.cards())?;
        let list_ids: Vec<EntityId> = lists
            .iter()
            .filter(|l| l.board == self.board_id)
            .map(|l| l.id)
            .collect();

        Ok(cards
            .into_iter()
            .filter(|c| list_ids.contains(&c.list))
            .filter(|c| term.is_empty() || c.matches(term))
            .collect())
    }
}
