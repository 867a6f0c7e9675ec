use axum::{
  extract::ws::{Message, WebSocket},
  extract::{State, WebSocketUpgrade},
  http::Method,
  response::IntoResponse,
  routing::get,
  Json, Router,
};
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use std::env;
use std::sync::Arc;
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::EnvFilter;

mod game;
mod protocol;
mod shared;

use game::config::GameConfig;
use game::room::Room;

#[derive(Clone)]
struct AppState {
  room: Arc<Room>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
  ok: bool,
  players: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .init();

  let config = GameConfig::from_env();
  tracing::info!(
    cols = config.cols,
    rows = config.rows,
    tick_ms = config.start_tick_ms,
    "starting game"
  );

  let state = AppState {
    room: Arc::new(Room::new(config)),
  };

  let cors = CorsLayer::new()
    .allow_origin(Any)
    .allow_methods([Method::GET])
    .allow_headers(Any);

  let app: Router = Router::new()
    .route("/api/health", get(health))
    .route("/ws", get(ws_handler))
    .layer(cors)
    .with_state(state);

  let port: u16 = env::var("PORT")
    .ok()
    .and_then(|value| value.parse().ok())
    .unwrap_or(8787);

  let address = format!("0.0.0.0:{port}");
  tracing::info!("listening on {address}");

  let listener = tokio::net::TcpListener::bind(&address).await?;
  axum::serve(listener, app).await?;

  Ok(())
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
  Json(HealthResponse {
    ok: true,
    players: state.room.session_count().await,
  })
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
  ws.on_upgrade(move |socket| handle_socket(socket, state.room))
}

async fn handle_socket(socket: WebSocket, room: Arc<Room>) {
  let (mut sender, mut receiver) = socket.split();
  let (tx, mut rx) = mpsc::unbounded_channel::<String>();
  let session_id = room.add_session(tx).await;

  let send_task = tokio::spawn(async move {
    while let Some(payload) = rx.recv().await {
      if sender.send(Message::Text(payload)).await.is_err() {
        break;
      }
    }
  });

  while let Some(result) = receiver.next().await {
    let Ok(message) = result else { break };
    match message {
      Message::Text(text) => {
        room.handle_text_message(&session_id, &text).await;
      }
      Message::Close(_) => break,
      _ => {}
    }
  }

  room.remove_session(&session_id).await;
  send_task.abort();
}
