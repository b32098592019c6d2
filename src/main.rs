use anyhow::Context;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kanban_client::api::{RemoteStore, StoreClient};
use kanban_client::auth::SessionContext;
use kanban_client::config::Config;
use kanban_client::domain::{filter_boards, Board, KanbanError};
use kanban_client::services::{view_events, BoardSession, BoardSnapshot};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,kanban_client=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Kanban client v{}...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config from env, using defaults: {}", e);
        Config::default()
    });

    let session = establish_session(&config).await?;

    let Some(board_id) = config.board_id else {
        print_boards(&config, session).await?;
        return Err(KanbanError::PreconditionMissing(
            "set KANBAN_BOARD_ID to one of the boards above".into(),
        )
        .into());
    };

    let events = view_events();
    let mut rx = events.subscribe();
    let board_session = BoardSession::open(session, &config, Some(board_id), events).await?;
    print_board(&board_session.board.snapshot().await);

    let watch = async {
        loop {
            match rx.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(line) => tracing::info!(event = line.as_str(), "View event"),
                    Err(e) => tracing::warn!("Failed to render view event: {}", e),
                },
                Err(RecvError::Lagged(n)) => {
                    tracing::debug!(skipped = n, "View event receiver lagged, continuing");
                }
                Err(RecvError::Closed) => break,
            }
        }
    };

    tokio::select! {
        _ = watch => {}
        _ = shutdown_signal() => {}
    }

    board_session.close().await;
    tracing::info!("Kanban client shut down gracefully");
    Ok(())
}

async fn establish_session(config: &Config) -> anyhow::Result<SessionContext> {
    if let Some(token) = &config.access_token {
        return Ok(SessionContext::with_token(config.api_base.clone(), token.clone()));
    }

    let (Some(username), Some(password)) = (&config.username, &config.password) else {
        return Err(KanbanError::Unauthenticated)
            .context("set KANBAN_ACCESS_TOKEN or KANBAN_USERNAME/KANBAN_PASSWORD");
    };

    let http = config.http_client()?;
    let session = SessionContext::login(&http, &config.api_base, username, password)
        .await
        .context("login failed")?;
    Ok(session)
}

async fn print_boards(config: &Config, session: SessionContext) -> anyhow::Result<()> {
    let store = RemoteStore::new(StoreClient::new(config.http_client()?, session));
    let boards = store.boards().await.context("failed loading boards")?;
    for board in filter_boards(&boards, "") {
        println!("{}", board_line(board));
    }
    Ok(())
}

fn board_line(board: &Board) -> String {
    format!(
        "{:>6}  {}  (members: {})",
        board.id,
        board.title,
        board.members.len()
    )
}

fn print_board(snapshot: &BoardSnapshot) {
    println!("# {}", snapshot.title);
    for view in &snapshot.lists {
        println!("\n## {} [{}]", view.list.title, view.list.position);
        for card in &view.cards {
            println!("  - {} [{}]", card.title, card.position);
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down...");
        }
    }
}
