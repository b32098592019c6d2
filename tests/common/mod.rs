#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch};

use kanban_client::api::{MutationGateway, RemoteStore, StoreClient};
use kanban_client::auth::SessionContext;
use kanban_client::config::Config;
use kanban_client::services::{
    view_events, BoardSnapshot, BoardViewModel, CardDetailController, CardRect, ChannelStatus,
    DragDropController, Reconciler, ViewEvent, ViewEvents,
};

pub const TOKEN: &str = "test-token";
pub const PASSWORD: &str = "secret";

#[derive(Default)]
pub struct StoreState {
    pub boards: Vec<Value>,
    pub lists: Vec<Value>,
    pub cards: Vec<Value>,
    pub comments: Vec<Value>,
    pub activity: Vec<Value>,
    pub next_id: i64,
    pub reject_moves: bool,
    /// Rejects only the n-th move request received, counting from 1.
    pub reject_move_number: Option<usize>,
    pub move_position_override: Option<i64>,
    pub fail_activity: bool,
    pub malformed_login: bool,
    pub push_unavailable: bool,
    /// (card, to_list, position) as received.
    pub moves: Vec<(i64, i64, i64)>,
}

impl StoreState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn has(items: &[Value], id: i64) -> bool {
        items.iter().any(|v| v["id"] == id)
    }
}

#[derive(Clone)]
enum PushCommand {
    Text(String),
    Close,
}

#[derive(Clone)]
struct AppState {
    store: Arc<Mutex<StoreState>>,
    push: broadcast::Sender<PushCommand>,
    connections: Arc<AtomicUsize>,
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("Bearer {TOKEN}"))
        .unwrap_or(false)
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"detail": "Authentication credentials were not provided."})),
    )
        .into_response()
}

fn bad_request(field: &str, message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ field: [message] }))).into_response()
}

macro_rules! collection_handler {
    ($name:ident, $field:ident) => {
        async fn $name(State(app): State<AppState>, headers: HeaderMap) -> Response {
            if !authorized(&headers) {
                return unauthorized();
            }
            let store = app.store.lock().unwrap();
            Json(store.$field.clone()).into_response()
        }
    };
}

collection_handler!(get_boards, boards);
collection_handler!(get_lists, lists);
collection_handler!(get_cards, cards);
collection_handler!(get_comments, comments);

async fn create_board(
    State(app): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let mut store = app.store.lock().unwrap();
    let id = store.next_id();
    let board = json!({"id": id, "title": body["title"], "owner": 1, "members": [{"id": 1, "username": "tester"}]});
    store.boards.push(board.clone());
    (StatusCode::CREATED, Json(board)).into_response()
}

async fn create_list(
    State(app): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let mut store = app.store.lock().unwrap();
    let Some(board) = body["board"].as_i64().filter(|b| StoreState::has(&store.boards, *b)) else {
        return bad_request("board", "Invalid pk - object does not exist.");
    };
    let id = store.next_id();
    let list = json!({"id": id, "board": board, "title": body["title"], "position": 1024});
    store.lists.push(list.clone());
    (StatusCode::CREATED, Json(list)).into_response()
}

async fn create_card(
    State(app): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let mut store = app.store.lock().unwrap();
    let Some(list) = body["list"].as_i64().filter(|l| StoreState::has(&store.lists, *l)) else {
        return bad_request("list", "Invalid pk - object does not exist.");
    };
    let id = store.next_id();
    let card = json!({
        "id": id, "list": list, "title": body["title"], "description": "",
        "position": 1024, "labels": []
    });
    store.cards.push(card.clone());
    (StatusCode::CREATED, Json(card)).into_response()
}

async fn get_card(
    State(app): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let store = app.store.lock().unwrap();
    match store.cards.iter().find(|c| c["id"] == id) {
        Some(card) => Json(card.clone()).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({"detail": "Not found."}))).into_response(),
    }
}

#[derive(Deserialize)]
struct MoveBody {
    to_list: i64,
    position: i64,
}

async fn move_card(
    State(app): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<MoveBody>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let mut store = app.store.lock().unwrap();
    store.moves.push((id, body.to_list, body.position));
    if store.reject_moves || store.reject_move_number == Some(store.moves.len()) {
        return (StatusCode::BAD_REQUEST, Json(json!({"detail": "Move rejected"}))).into_response();
    }
    let position = store.move_position_override.unwrap_or(body.position);
    match store.cards.iter_mut().find(|c| c["id"] == id) {
        Some(card) => {
            card["list"] = json!(body.to_list);
            card["position"] = json!(position);
            Json(card.clone()).into_response()
        }
        None => (StatusCode::NOT_FOUND, Json(json!({"detail": "Not found."}))).into_response(),
    }
}

async fn create_comment(
    State(app): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let mut store = app.store.lock().unwrap();
    let Some(card) = body["card"].as_i64().filter(|c| StoreState::has(&store.cards, *c)) else {
        return bad_request("card", "Invalid pk - object does not exist.");
    };
    let id = store.next_id();
    let comment = json!({
        "id": id, "card": card, "text": body["text"],
        "author": {"id": 1, "username": "tester"},
        "created_at": Utc::now().to_rfc3339(),
    });
    store.comments.push(comment.clone());
    (StatusCode::CREATED, Json(comment)).into_response()
}

#[derive(Deserialize)]
struct ActivityQuery {
    board: i64,
}

async fn get_activity(
    State(app): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ActivityQuery>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let store = app.store.lock().unwrap();
    if store.fail_activity {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    let entries: Vec<Value> = store
        .activity
        .iter()
        .filter(|a| a["board_id"] == query.board)
        .cloned()
        .collect();
    Json(entries).into_response()
}

async fn login(State(app): State<AppState>, Json(body): Json<Value>) -> Response {
    if app.store.lock().unwrap().malformed_login {
        return (StatusCode::ACCEPTED, "login queued").into_response();
    }
    if body["password"] == PASSWORD {
        Json(json!({
            "access": TOKEN,
            "refresh": "refresh-token",
            "user": {"id": 1, "username": body["username"], "email": "tester@example.com"},
        }))
        .into_response()
    } else {
        bad_request("non_field_errors", "Invalid username or password")
    }
}

async fn push_endpoint(
    ws: WebSocketUpgrade,
    Path(_board_id): Path<i64>,
    State(app): State<AppState>,
) -> Response {
    if app.store.lock().unwrap().push_unavailable {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    let rx = app.push.subscribe();
    app.connections.fetch_add(1, Ordering::SeqCst);
    ws.on_upgrade(move |socket| push_loop(socket, rx))
}

async fn push_loop(mut socket: WebSocket, mut rx: broadcast::Receiver<PushCommand>) {
    loop {
        match rx.recv().await {
            Ok(PushCommand::Text(text)) => {
                if socket.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            Ok(PushCommand::Close) => {
                let _ = socket.send(Message::Close(None)).await;
                break;
            }
            Err(RecvError::Lagged(_)) => continue,
            Err(RecvError::Closed) => break,
        }
    }
}

/// In-process stand-in for the REST store and the push broadcaster.
pub struct FakeStore {
    pub addr: SocketAddr,
    app: AppState,
    server: tokio::task::JoinHandle<()>,
}

impl FakeStore {
    pub async fn start() -> Self {
        let (push, _) = broadcast::channel(64);
        let app = AppState {
            store: Arc::new(Mutex::new(StoreState::default())),
            push,
            connections: Arc::new(AtomicUsize::new(0)),
        };

        let router = Router::new()
            .route("/api/login/", post(login))
            .route("/api/boards/", get(get_boards).post(create_board))
            .route("/api/lists/", get(get_lists).post(create_list))
            .route("/api/cards/", get(get_cards).post(create_card))
            .route("/api/cards/{id}/", get(get_card))
            .route("/api/cards/{id}/move/", post(move_card))
            .route("/api/comments/", get(get_comments).post(create_comment))
            .route("/api/activity/", get(get_activity))
            .route("/ws/boards/{board_id}/", get(push_endpoint))
            .with_state(app.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("fake store should bind");
        let addr = listener.local_addr().expect("fake store should have an address");
        let server = tokio::spawn(async move {
            axum::serve(listener, router)
                .await
                .expect("fake store should serve");
        });

        Self { addr, app, server }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn session(&self) -> SessionContext {
        SessionContext::with_token(self.base_url(), TOKEN)
    }

    pub fn config(&self) -> Config {
        Config {
            api_base: self.base_url(),
            access_token: Some(TOKEN.into()),
            reconnect_delay: Duration::from_millis(50),
            comment_settle_delay: Duration::from_millis(10),
            request_timeout: Duration::from_secs(5),
            ..Config::default()
        }
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut StoreState) -> R) -> R {
        let mut store = self.app.store.lock().unwrap();
        f(&mut store)
    }

    pub fn seed_board(&self, title: &str) -> i64 {
        self.with(|s| {
            let id = s.next_id();
            s.boards.push(json!({"id": id, "title": title, "members": []}));
            id
        })
    }

    pub fn seed_list(&self, board: i64, title: &str, position: i64) -> i64 {
        self.with(|s| {
            let id = s.next_id();
            s.lists
                .push(json!({"id": id, "board": board, "title": title, "position": position}));
            id
        })
    }

    pub fn seed_card(&self, list: i64, title: &str, position: i64) -> i64 {
        self.with(|s| {
            let id = s.next_id();
            s.cards.push(json!({
                "id": id, "list": list, "title": title, "description": "",
                "position": position, "labels": []
            }));
            id
        })
    }

    pub fn set_labels(&self, card: i64, labels: Value) {
        self.with(|s| {
            if let Some(c) = s.cards.iter_mut().find(|c| c["id"] == card) {
                c["labels"] = labels;
            }
        })
    }

    pub fn seed_comment(&self, card: i64, text: &str, created_at: DateTime<Utc>) -> i64 {
        self.with(|s| {
            let id = s.next_id();
            s.comments.push(json!({
                "id": id, "card": card, "text": text,
                "author": {"id": 2, "username": "ada"},
                "created_at": created_at.to_rfc3339(),
            }));
            id
        })
    }

    pub fn seed_activity(&self, board: i64, user: &str, action: &str) {
        self.with(|s| {
            let id = s.next_id();
            s.activity.push(json!({
                "id": id, "board_id": board, "user": user, "action": action,
                "details": {}, "created_at": Utc::now().to_rfc3339(),
            }));
        })
    }

    pub fn moves(&self) -> Vec<(i64, i64, i64)> {
        self.with(|s| s.moves.clone())
    }

    pub fn push(&self, payload: &str) {
        let _ = self.app.push.send(PushCommand::Text(payload.to_string()));
    }

    pub fn close_push_connections(&self) {
        let _ = self.app.push.send(PushCommand::Close);
    }

    pub fn push_connections(&self) -> usize {
        self.app.connections.load(Ordering::SeqCst)
    }
}

impl Drop for FakeStore {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// Components wired the way `BoardSession` wires them, minus the push channel.
pub struct Parts {
    pub board: Arc<BoardViewModel>,
    pub detail: Arc<CardDetailController>,
    pub reconciler: Reconciler,
    pub drag: DragDropController,
    pub gateway: MutationGateway,
    pub events: ViewEvents,
}

pub fn parts_with_session(store: &FakeStore, session: SessionContext, board_id: i64) -> Parts {
    let client = StoreClient::new(reqwest::Client::new(), session);
    let remote = RemoteStore::new(client.clone());
    let gateway = MutationGateway::new(client);
    let events = view_events();

    let board = Arc::new(BoardViewModel::new(
        board_id,
        remote.clone(),
        gateway.clone(),
        events.clone(),
    ));
    let detail = Arc::new(CardDetailController::new(
        remote,
        gateway.clone(),
        store.config().comment_settle_delay,
        events.clone(),
    ));
    let reconciler = Reconciler::new(Arc::clone(&board), Arc::clone(&detail));
    let drag = DragDropController::new(
        Arc::clone(&board),
        gateway.clone(),
        reconciler.clone(),
        events.clone(),
    );

    Parts {
        board,
        detail,
        reconciler,
        drag,
        gateway,
        events,
    }
}

pub fn parts(store: &FakeStore, board_id: i64) -> Parts {
    parts_with_session(store, store.session(), board_id)
}

pub const CARD_HEIGHT: f64 = 40.0;
pub const CARD_PITCH: f64 = 50.0;

/// Lays the cards of `list_id` out top to bottom, one every `CARD_PITCH`.
pub fn rects(snapshot: &BoardSnapshot, list_id: i64) -> Vec<CardRect> {
    snapshot
        .list(list_id)
        .map(|v| {
            v.cards
                .iter()
                .enumerate()
                .map(|(i, c)| CardRect {
                    card_id: c.id,
                    top: i as f64 * CARD_PITCH,
                    height: CARD_HEIGHT,
                })
                .collect()
        })
        .unwrap_or_default()
}

/// A pointer just inside the top edge of the `index`-th rect.
pub fn pointer_at(rects: &[CardRect], index: usize) -> f64 {
    rects.get(index).map(|r| r.top + 1.0).unwrap_or(10_000.0)
}

pub async fn wait_for_event<F>(rx: &mut broadcast::Receiver<ViewEvent>, mut pred: F) -> ViewEvent
where
    F: FnMut(&ViewEvent) -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match rx.recv().await {
                Ok(event) if pred(&event) => return event,
                Ok(_) | Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => panic!("view event channel closed"),
            }
        }
    })
    .await
    .expect("expected view event should arrive")
}

pub fn drain(rx: &mut broadcast::Receiver<ViewEvent>) -> Vec<ViewEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub async fn wait_for_status(mut rx: watch::Receiver<ChannelStatus>, status: ChannelStatus) {
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|s| *s == status))
        .await
        .expect("channel status should be reached in time")
        .expect("channel status sender should be alive");
}

pub fn card_order(snapshot: &BoardSnapshot, list_id: i64) -> Vec<i64> {
    snapshot
        .list(list_id)
        .map(|v| v.card_ids())
        .unwrap_or_default()
}
